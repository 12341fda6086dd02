use std::process::ExitCode;

use clap::Parser;
use deployer::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing `.env` is fine, the environment may already be configured
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .pretty()
        .with_writer(std::io::stderr)
        .init();

    let rpc_url = cli.resolved_rpc_url();
    let command = cli.command.unwrap_or_default();
    match command.run(&cli.priv_key, &rpc_url).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
