//! The deployment runner: validates a sequence of targets against the
//! compiled artifacts, then deploys them one at a time

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{utils::format_ether, Address, U256},
};
use tracing::{error, info};

use crate::{
    artifacts::{ContractFactory, ContractRegistry},
    client::ChainClient,
    errors::{DeployError, RunFailure},
    types::{ConstructorArg, DeployedInstance, DeploymentTarget, RunState, SignerIdentity},
    utils::write_deployed_address,
};

/// Receives the progress of a deployment run
pub trait DeploymentObserver {
    /// Called once, after every target is validated and before the first is
    /// submitted, with the deploying account
    fn on_start(&mut self, signer: &SignerIdentity) -> Result<(), DeployError>;

    /// Called after each confirmed deployment, before the next target starts
    fn on_deployed(&mut self, index: usize, instance: &DeployedInstance)
        -> Result<(), DeployError>;
}

/// Writes line-oriented progress to a writer, and optionally records each
/// deployed address in a deployments file
pub struct Reporter<W> {
    /// The progress output
    out: W,
    /// The deployments file to record addresses in
    deployments_path: Option<PathBuf>,
    /// The amount locked by the plan, reported after the account
    locked_amount: Option<U256>,
}

impl<W: Write> Reporter<W> {
    /// A reporter that only writes progress lines
    pub fn new(out: W) -> Self {
        Self {
            out,
            deployments_path: None,
            locked_amount: None,
        }
    }

    /// Also record each deployed address in the given deployments file
    pub fn with_deployments_file(mut self, path: impl AsRef<Path>) -> Self {
        self.deployments_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Also report the amount, in wei, the plan locks
    pub fn with_locked_amount(mut self, amount: U256) -> Self {
        self.locked_amount = Some(amount);
        self
    }

    /// Consume the reporter, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write a single progress line
    fn line(&mut self, line: String) -> Result<(), DeployError> {
        writeln!(self.out, "{line}").map_err(|e| DeployError::ReportOutput(e.to_string()))
    }
}

impl<W: Write> DeploymentObserver for Reporter<W> {
    fn on_start(&mut self, signer: &SignerIdentity) -> Result<(), DeployError> {
        self.line(format!("Deploying with account: {}", signer.address))?;
        if let Some(amount) = self.locked_amount {
            self.line(format!("Locked amount: {amount}"))?;
        }
        Ok(())
    }

    fn on_deployed(
        &mut self,
        _index: usize,
        instance: &DeployedInstance,
    ) -> Result<(), DeployError> {
        self.line(instance.to_string())?;
        if let Some(path) = &self.deployments_path {
            write_deployed_address(path, &instance.name, instance.address)?;
        }
        Ok(())
    }
}

/// A constructor argument after validation against the constructor ABI
#[derive(Debug, Clone)]
enum ResolvedArg {
    /// A value ready to encode
    Value(DynSolValue),
    /// The address of the target at this index
    AddressOf(usize),
}

/// A target whose factory and arguments have been validated
struct PreparedTarget<'t> {
    /// The target as given
    target: &'t DeploymentTarget,
    /// The factory building the target's creation code
    factory: ContractFactory,
    /// The checked constructor arguments
    args: Vec<ResolvedArg>,
}

/// Deploys a sequence of targets through a chain client, strictly in order
pub struct DeploymentRunner<'a, C> {
    /// The client submitting and confirming transactions
    client: &'a C,
    /// The compiled contracts targets are resolved against
    registry: &'a ContractRegistry,
    /// The state of the most recent run
    state: RunState,
}

impl<'a, C: ChainClient> DeploymentRunner<'a, C> {
    /// A runner resolving contracts from `registry` and deploying through `client`
    pub fn new(client: &'a C, registry: &'a ContractRegistry) -> Self {
        Self {
            client,
            registry,
            state: RunState::NotStarted,
        }
    }

    /// The state of the most recent run
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Deploy every target in order, stopping at the first failure
    ///
    /// All targets are validated before the first transaction is sent, so an
    /// unknown contract or a malformed argument anywhere in the sequence
    /// aborts the run with nothing deployed. Once deployment starts, a
    /// failure leaves earlier targets on chain; they are returned in the
    /// [`RunFailure`].
    pub async fn run_deployments(
        &mut self,
        signer: &SignerIdentity,
        targets: &[DeploymentTarget],
        observer: &mut impl DeploymentObserver,
    ) -> Result<Vec<DeployedInstance>, RunFailure> {
        self.state = RunState::NotStarted;
        if targets.is_empty() {
            self.state = RunState::Succeeded;
            return Ok(Vec::new());
        }

        let prepared = match self.prepare(targets) {
            Ok(prepared) => prepared,
            Err((index, cause)) => return Err(self.fail(index, targets, cause, Vec::new())),
        };

        if let Err(cause) = observer.on_start(signer) {
            return Err(self.fail(0, targets, cause, Vec::new()));
        }

        let mut deployed: Vec<DeployedInstance> = Vec::with_capacity(targets.len());
        for (index, target) in prepared.iter().enumerate() {
            self.state = RunState::Deploying(index);
            info!(
                "deploying {} ({}/{})",
                target.target.name,
                index + 1,
                targets.len()
            );

            let instance = match self.deploy_one(signer, target, &deployed).await {
                Ok(instance) => instance,
                Err(cause) => return Err(self.fail(index, targets, cause, deployed)),
            };

            info!("{} confirmed in {}", instance.name, instance.tx_hash);
            deployed.push(instance);
            if let Err(cause) = observer.on_deployed(index, &deployed[index]) {
                return Err(self.fail(index, targets, cause, deployed));
            }
        }

        self.state = RunState::Succeeded;
        Ok(deployed)
    }

    /// Check every target against the registry without touching the network
    pub fn validate(&mut self, targets: &[DeploymentTarget]) -> Result<(), RunFailure> {
        match self.prepare(targets) {
            Ok(_) => Ok(()),
            Err((index, cause)) => Err(self.fail(index, targets, cause, Vec::new())),
        }
    }

    /// Resolve the factory of every target and check its arguments, before
    /// anything touches the network
    fn prepare<'t>(
        &self,
        targets: &'t [DeploymentTarget],
    ) -> Result<Vec<PreparedTarget<'t>>, (usize, DeployError)> {
        (0..targets.len())
            .map(|index| prepare_target(self.registry, targets, index).map_err(|e| (index, e)))
            .collect()
    }

    /// Submit and confirm a single validated target
    async fn deploy_one(
        &self,
        signer: &SignerIdentity,
        prepared: &PreparedTarget<'_>,
        deployed: &[DeployedInstance],
    ) -> Result<DeployedInstance, DeployError> {
        let args: Vec<DynSolValue> = prepared
            .args
            .iter()
            .map(|arg| match arg {
                ResolvedArg::Value(value) => value.clone(),
                ResolvedArg::AddressOf(index) => DynSolValue::Address(deployed[*index].address),
            })
            .collect();
        let code = prepared.factory.deploy_code(&args)?;

        let target = prepared.target;
        if !target.value.is_zero() {
            info!("sending {} ETH with {}", format_ether(target.value), target.name);
        }

        let pending = self
            .client
            .submit_deployment(signer, &target.name, code, target.value)
            .await?;
        self.client.await_confirmation(pending).await
    }

    /// Record a failure in the runner state and build the error
    fn fail(
        &mut self,
        index: usize,
        targets: &[DeploymentTarget],
        cause: DeployError,
        deployed: Vec<DeployedInstance>,
    ) -> RunFailure {
        let target = targets
            .get(index)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        error!("deployment #{index} ({target}) failed: {cause}");

        self.state = RunState::Failed(index, cause.clone());
        RunFailure {
            index,
            target,
            cause,
            deployed,
        }
    }
}

/// Validate a single target against its factory
fn prepare_target<'t>(
    registry: &ContractRegistry,
    targets: &'t [DeploymentTarget],
    index: usize,
) -> Result<PreparedTarget<'t>, DeployError> {
    let target = &targets[index];
    let factory = registry.factory(&target.name)?;

    if !target.value.is_zero() && !factory.is_payable() {
        return Err(DeployError::CalldataConstruction(format!(
            "{} constructor is not payable but {} wei was given",
            target.name, target.value
        )));
    }

    let types = factory.constructor_types()?;
    if types.len() != target.args.len() {
        return Err(DeployError::CalldataConstruction(format!(
            "{} constructor takes {} arguments, {} given",
            target.name,
            types.len(),
            target.args.len()
        )));
    }

    let args = types
        .iter()
        .zip(&target.args)
        .enumerate()
        .map(|(position, (ty, arg))| resolve_arg(targets, index, position, ty, arg))
        .collect::<Result<Vec<_>, _>>()?;

    // Encode once with placeholder addresses so encoding can't fail mid-run
    let trial_args: Vec<DynSolValue> = args
        .iter()
        .map(|arg| match arg {
            ResolvedArg::Value(value) => value.clone(),
            ResolvedArg::AddressOf(_) => DynSolValue::Address(Address::ZERO),
        })
        .collect();
    factory.deploy_code(&trial_args)?;

    Ok(PreparedTarget {
        target,
        factory,
        args,
    })
}

/// Check one constructor argument against its ABI type
fn resolve_arg(
    targets: &[DeploymentTarget],
    index: usize,
    position: usize,
    ty: &DynSolType,
    arg: &ConstructorArg,
) -> Result<ResolvedArg, DeployError> {
    let name = &targets[index].name;
    match arg {
        ConstructorArg::Value(value) if ty.matches(value) => Ok(ResolvedArg::Value(value.clone())),
        ConstructorArg::Value(_) => Err(DeployError::CalldataConstruction(format!(
            "{name} argument {position} is not a {ty}"
        ))),
        ConstructorArg::Raw(raw) => ty.coerce_str(raw).map(ResolvedArg::Value).map_err(|e| {
            DeployError::CalldataConstruction(format!("{name} argument {position}: {e}"))
        }),
        ConstructorArg::AddressOf(reference) => {
            if *ty != DynSolType::Address {
                return Err(DeployError::CalldataConstruction(format!(
                    "{name} argument {position} is a {ty}, not an address"
                )));
            }

            targets[..index]
                .iter()
                .rposition(|t| &t.name == reference)
                .map(ResolvedArg::AddressOf)
                .ok_or_else(|| {
                    DeployError::UnresolvedReference(format!(
                        "{name} argument {position} refers to {reference}, which is not deployed before it"
                    ))
                })
        }
    }
}
