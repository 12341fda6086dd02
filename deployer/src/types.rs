//! Type definitions used throughout the deployer

use std::fmt::{self, Display};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, TxHash, U256},
    signers::local::PrivateKeySigner,
};

use crate::errors::DeployError;

/// The account that authorizes every deployment transaction in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerIdentity {
    /// The address of the deploying account
    pub address: Address,
}

impl SignerIdentity {
    /// Build the identity of a local private key signer
    pub fn from_signer(signer: &PrivateKeySigner) -> Self {
        Self {
            address: signer.address(),
        }
    }
}

/// A single constructor argument of a deployment target
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructorArg {
    /// An already-typed ABI value
    Value(DynSolValue),
    /// A string coerced against the constructor's ABI parameter type
    Raw(String),
    /// The address of a target deployed earlier in the same run
    AddressOf(String),
}

impl From<DynSolValue> for ConstructorArg {
    fn from(value: DynSolValue) -> Self {
        ConstructorArg::Value(value)
    }
}

/// A contract to deploy, along with its constructor arguments and the value
/// sent in the deployment transaction
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTarget {
    /// The contract name, as it appears in the compiled artifacts
    pub name: String,
    /// The constructor arguments, in ABI order
    pub args: Vec<ConstructorArg>,
    /// The value, in wei, sent with the deployment transaction
    pub value: U256,
}

impl DeploymentTarget {
    /// A target with no constructor arguments and no value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            value: U256::ZERO,
        }
    }

    /// Append a constructor argument
    pub fn with_arg(mut self, arg: impl Into<ConstructorArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the value sent with the deployment transaction
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// A deployment transaction accepted by the network but not yet confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    /// The name of the contract being deployed
    pub name: String,
    /// The hash of the deployment transaction
    pub tx_hash: TxHash,
}

/// A contract whose deployment transaction has been confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedInstance {
    /// The name of the deployed contract
    pub name: String,
    /// The address assigned to the contract by the chain
    pub address: Address,
    /// The hash of the deployment transaction
    pub tx_hash: TxHash,
    /// The block the deployment was included in, if the endpoint reports it
    pub block_number: Option<u64>,
}

impl Display for DeployedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} deployed to: {}", self.name, self.address)
    }
}

/// The progress of a deployment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// No target has been attempted yet
    NotStarted,
    /// The target at the given index is being deployed
    Deploying(usize),
    /// Every target was deployed
    Succeeded,
    /// The target at the given index failed, no later target was attempted
    Failed(usize, DeployError),
}
