//! Definitions of CLI arguments and commands for the deployer

use std::{env, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use eyre::Result;

use crate::{
    commands::{deploy, list_contracts, parse_ether},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_RPC_URL, NUM_DEPLOY_CONFIRMATIONS, PRIVATE_KEY_ENV_VAR,
        RPC_URL_ENV_VAR, SEPOLIA_RPC_URL_ENV_VAR,
    },
    plans::Plan,
};

/// Deploy compiled contracts to an EVM network, one at a time
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = PRIVATE_KEY_ENV_VAR, default_value = "", hide_env_values = true)]
    pub priv_key: String,

    /// Network RPC URL, falling back to `RPC_URL` and then a local node
    #[arg(short, long, env = SEPOLIA_RPC_URL_ENV_VAR)]
    pub rpc_url: Option<String>,

    /// The command to run, `deploy` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The RPC URL to connect to
    pub fn resolved_rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .or_else(|| env::var(RPC_URL_ENV_VAR).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string())
    }
}

/// The deployer's commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a plan of contracts in order
    Deploy(DeployArgs),
    /// Print the wei value of a decimal ether amount
    ParseEther(ParseEtherArgs),
    /// List the deployable contracts in the artifacts directory
    ListContracts(ListContractsArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Deploy(DeployArgs::default())
    }
}

impl Command {
    /// Run the command
    pub async fn run(self, priv_key: &str, rpc_url: &str) -> Result<()> {
        match self {
            Command::Deploy(args) => deploy(args, priv_key, rpc_url).await,
            Command::ParseEther(args) => parse_ether(args),
            Command::ListContracts(args) => list_contracts(args),
        }
    }
}

/// Deploy a plan
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DeployArgs {
    /// The built-in plan to deploy
    #[arg(long, value_enum, default_value_t = Plan::Lock)]
    pub plan: Plan,

    /// A JSON plan file, replacing the built-in plan
    #[arg(long)]
    pub plan_file: Option<PathBuf>,

    /// The directory containing the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// A JSON file in which to record each deployed address
    #[arg(short, long)]
    pub deployments: Option<PathBuf>,

    /// The number of confirmations to wait for on each deployment
    #[arg(long, default_value_t = NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Seconds to wait for each confirmation before giving up
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Default for DeployArgs {
    fn default() -> Self {
        Self {
            plan: Plan::default(),
            plan_file: None,
            artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            deployments: None,
            confirmations: NUM_DEPLOY_CONFIRMATIONS,
            timeout: None,
        }
    }
}

/// Parse an ether amount
#[derive(Args, Debug, Clone)]
pub struct ParseEtherArgs {
    /// The decimal ether amount, e.g. `0.001`
    pub amount: String,
}

/// List deployable contracts
#[derive(Args, Debug, Clone)]
pub struct ListContractsArgs {
    /// The directory containing the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,
}
