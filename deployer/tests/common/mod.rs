//! Shared helpers for the deployer tests: an in-memory chain client and
//! artifact fixtures

#![allow(dead_code)]

use std::{collections::HashMap, sync::Mutex};

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use deployer::{
    artifacts::{ContractArtifact, ContractRegistry},
    client::ChainClient,
    errors::DeployError,
    types::{DeployedInstance, PendingDeployment, SignerIdentity},
};

/// The first default account of an Anvil node
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// A creation transaction observed by the mock
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub code: Bytes,
    pub value: U256,
}

#[derive(Default)]
struct MockState {
    /// The deployer's next nonce, shared across runs like a real chain
    nonce: u64,
    submissions: Vec<Submission>,
    confirmations: usize,
    pending: HashMap<TxHash, Address>,
    fail_submission: Option<(usize, DeployError)>,
    fail_confirmation: Option<(usize, DeployError)>,
}

/// A chain client that assigns `CREATE` addresses from the deployer's nonce
#[derive(Default)]
pub struct MockChainClient {
    state: Mutex<MockState>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th submission (zero-based) with `err`
    pub fn fail_submission(self, n: usize, err: DeployError) -> Self {
        self.state.lock().unwrap().fail_submission = Some((n, err));
        self
    }

    /// Fail the `n`th confirmation (zero-based) with `err`
    pub fn fail_confirmation(self, n: usize, err: DeployError) -> Self {
        self.state.lock().unwrap().fail_confirmation = Some((n, err));
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn confirmation_count(&self) -> usize {
        self.state.lock().unwrap().confirmations
    }
}

impl ChainClient for MockChainClient {
    async fn submit_deployment(
        &self,
        signer: &SignerIdentity,
        name: &str,
        code: Bytes,
        value: U256,
    ) -> Result<PendingDeployment, DeployError> {
        let mut state = self.state.lock().unwrap();
        let index = state.submissions.len();
        state.submissions.push(Submission {
            name: name.to_string(),
            code,
            value,
        });

        if let Some((n, err)) = &state.fail_submission {
            if *n == index {
                return Err(err.clone());
            }
        }

        let nonce = state.nonce;
        state.nonce += 1;
        let tx_hash = keccak256([signer.address.as_slice(), &nonce.to_be_bytes()[..]].concat());
        state.pending.insert(tx_hash, signer.address.create(nonce));

        Ok(PendingDeployment {
            name: name.to_string(),
            tx_hash,
        })
    }

    async fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeployedInstance, DeployError> {
        let mut state = self.state.lock().unwrap();
        let index = state.confirmations;
        state.confirmations += 1;

        if let Some((n, err)) = &state.fail_confirmation {
            if *n == index {
                return Err(err.clone());
            }
        }

        let address = state
            .pending
            .remove(&pending.tx_hash)
            .ok_or_else(|| DeployError::NetworkFailure("unknown transaction".to_string()))?;

        Ok(DeployedInstance {
            name: pending.name,
            address,
            tx_hash: pending.tx_hash,
            block_number: Some(index as u64 + 1),
        })
    }
}

/// The identity of the Anvil deployer
pub fn deployer() -> SignerIdentity {
    SignerIdentity { address: DEPLOYER }
}

/// A Hardhat artifact with the given constructor ABI entry, or none
pub fn artifact(name: &str, constructor: Option<&str>) -> ContractArtifact {
    let abi = constructor.map(|c| format!("[{c}]")).unwrap_or_else(|| "[]".to_string());
    let json = format!(
        r#"{{
            "_format": "hh-sol-artifact-1",
            "contractName": "{name}",
            "sourceName": "contracts/{name}.sol",
            "abi": {abi},
            "bytecode": "0x6080604052348015600f57600080fd5b50",
            "deployedBytecode": "0x6080604052",
            "linkReferences": {{}},
            "deployedLinkReferences": {{}}
        }}"#
    );
    ContractArtifact::from_json(&json).unwrap()
}

/// `constructor(uint256 _unlockTime) payable`
pub const LOCK_CONSTRUCTOR: &str = r#"{
    "inputs": [{ "internalType": "uint256", "name": "_unlockTime", "type": "uint256" }],
    "stateMutability": "payable",
    "type": "constructor"
}"#;

/// `constructor(address kyc)`
pub const KYC_WIRED_CONSTRUCTOR: &str = r#"{
    "inputs": [{ "internalType": "address", "name": "kyc", "type": "address" }],
    "stateMutability": "nonpayable",
    "type": "constructor"
}"#;

/// A registry holding the `Lock`, `KYCContract`, `TransactionContract` and
/// `KycConsumer` artifacts
pub fn registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.insert(artifact("Lock", Some(LOCK_CONSTRUCTOR)));
    registry.insert(artifact("KYCContract", None));
    registry.insert(artifact("TransactionContract", None));
    registry.insert(artifact("KycConsumer", Some(KYC_WIRED_CONSTRUCTOR)));
    registry
}

/// The non-empty lines written by a reporter
pub fn lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
