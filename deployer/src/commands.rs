//! Implementations of the deployer's commands

use std::{io, path::Path, time::Duration};

use alloy::primitives::{
    utils::{format_ether, parse_ether as parse_ether_units},
    U256,
};
use chrono::Utc;
use eyre::Result;
use tracing::{info, warn};

use crate::{
    artifacts::ContractRegistry,
    cli::{DeployArgs, ListContractsArgs, ParseEtherArgs},
    client::RpcChainClient,
    plans::{locked_amount, read_plan, Plan},
    runner::{DeploymentRunner, Reporter},
    types::{DeploymentTarget, SignerIdentity},
    utils::{read_deployments, setup_client},
};

/// Deploy the targets of a plan, printing each address as it is confirmed
pub async fn deploy(args: DeployArgs, priv_key: &str, rpc_url: &str) -> Result<()> {
    let (client, signer) = setup_client(priv_key, rpc_url)?;
    let client = client
        .with_confirmations(args.confirmations)
        .with_timeout(args.timeout.map(Duration::from_secs));

    let registry = ContractRegistry::load(&args.artifacts)?;
    let targets = match &args.plan_file {
        Some(path) => read_plan(path)?,
        None => args.plan.targets(Utc::now())?,
    };
    if targets.is_empty() {
        warn!("the plan has no targets, nothing to deploy");
        return Ok(());
    }

    let mut runner = DeploymentRunner::new(&client, &registry);
    runner.validate(&targets)?;
    if let Some(path) = &args.deployments {
        log_recorded_deployments(path)?;
    }

    info!("deploying to {rpc_url}");
    preflight(&client, &signer, &targets).await?;

    let mut reporter = Reporter::new(io::stdout());
    if args.plan_file.is_none() && args.plan == Plan::Lock {
        reporter = reporter.with_locked_amount(locked_amount()?);
    }
    if let Some(path) = &args.deployments {
        reporter = reporter.with_deployments_file(path);
    }

    let deployed = runner
        .run_deployments(&signer, &targets, &mut reporter)
        .await?;

    info!("deployed {} contracts", deployed.len());
    Ok(())
}

/// Log the addresses a previous run recorded, which this run overwrites
/// for any contract it deploys again
fn log_recorded_deployments(path: &Path) -> Result<()> {
    for (name, address) in read_deployments(path)? {
        info!("{name} previously recorded at {address}");
    }
    Ok(())
}

/// Log the network and warn when the deployer can't fund the plan
async fn preflight(
    client: &RpcChainClient,
    signer: &SignerIdentity,
    targets: &[DeploymentTarget],
) -> Result<()> {
    let chain_id = client.chain_id().await?;
    let balance = client.balance(signer.address).await?;
    info!("chain id {chain_id}, deployer balance {} ETH", format_ether(balance));

    let required = targets
        .iter()
        .fold(U256::ZERO, |total, target| total.saturating_add(target.value));
    if balance < required {
        warn!(
            "deployer balance {} ETH is below the {} ETH the plan sends",
            format_ether(balance),
            format_ether(required)
        );
    }

    Ok(())
}

/// Print the wei value of a decimal ether amount
pub fn parse_ether(args: ParseEtherArgs) -> Result<()> {
    let amount = parse_ether_units(&args.amount)?;
    println!("Parsed: {amount}");
    Ok(())
}

/// Print the name of every deployable contract
pub fn list_contracts(args: ListContractsArgs) -> Result<()> {
    let registry = ContractRegistry::load(&args.artifacts)?;
    if registry.is_empty() {
        warn!("no contracts found in {}", args.artifacts.display());
    }

    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}
