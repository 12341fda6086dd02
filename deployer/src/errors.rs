//! Definitions of errors that can occur while deploying contracts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use crate::types::DeployedInstance;

/// Errors that can occur while resolving, submitting or confirming a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// No usable private key was configured
    SignerUnavailable(String),
    /// Error reading or parsing a compiled contract artifact
    ArtifactParsing(String),
    /// No compiled artifact exists for the requested contract name
    UnknownContract(String),
    /// Error constructing the constructor calldata for a deployment
    CalldataConstruction(String),
    /// A constructor argument references a target that is not deployed before it
    UnresolvedReference(String),
    /// Error reaching the network endpoint
    NetworkFailure(String),
    /// The deployment transaction was mined but did not create a contract
    TransactionReverted(String),
    /// The deployment transaction was not confirmed in time
    DeploymentTimeout(String),
    /// Error reading a deployment plan file
    ReadPlan(String),
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// Error writing progress output
    ReportOutput(String),
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            DeployError::SignerUnavailable(s) => write!(f, "signer unavailable: {}", s),
            DeployError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            DeployError::UnknownContract(s) => write!(f, "unknown contract: {}", s),
            DeployError::CalldataConstruction(s) => {
                write!(f, "error constructing calldata: {}", s)
            }
            DeployError::UnresolvedReference(s) => write!(f, "unresolved reference: {}", s),
            DeployError::NetworkFailure(s) => write!(f, "network failure: {}", s),
            DeployError::TransactionReverted(s) => write!(f, "transaction reverted: {}", s),
            DeployError::DeploymentTimeout(s) => write!(f, "deployment timed out: {}", s),
            DeployError::ReadPlan(s) => write!(f, "error reading plan: {}", s),
            DeployError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            DeployError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            DeployError::ReportOutput(s) => write!(f, "error writing output: {}", s),
        }
    }
}

impl Error for DeployError {}

/// The first failure of a deployment run
///
/// Instances deployed before the failing target stay on chain, they are
/// carried here so the caller can report or record them.
#[derive(Debug)]
pub struct RunFailure {
    /// The index of the failing target in the plan
    pub index: usize,
    /// The name of the failing target
    pub target: String,
    /// The cause of the failure
    pub cause: DeployError,
    /// The instances confirmed before the failure, in plan order
    pub deployed: Vec<DeployedInstance>,
}

impl Display for RunFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deployment #{} ({}) failed: {}",
            self.index, self.target, self.cause
        )
    }
}

impl Error for RunFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}
