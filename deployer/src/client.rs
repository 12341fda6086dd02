//! The chain client used by the deployment runner, and its JSON-RPC
//! implementation

use std::time::{Duration, Instant};

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::TransportError,
};
use tracing::debug;

use crate::{
    constants::NUM_DEPLOY_CONFIRMATIONS,
    errors::DeployError,
    types::{DeployedInstance, PendingDeployment, SignerIdentity},
};

/// The interval at which the deployment receipt is polled
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Submission and confirmation of contract deployment transactions
///
/// Implementations manage the signer's nonce; the runner never submits two
/// deployments concurrently.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Submit a contract creation transaction signed by `signer`, returning
    /// once the endpoint has accepted it
    async fn submit_deployment(
        &self,
        signer: &SignerIdentity,
        name: &str,
        code: Bytes,
        value: U256,
    ) -> Result<PendingDeployment, DeployError>;

    /// Wait until the deployment transaction is confirmed, returning the
    /// deployed instance
    async fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeployedInstance, DeployError>;
}

/// A chain client backed by a JSON-RPC provider with the deployer's wallet
/// attached
#[derive(Clone)]
pub struct RpcChainClient {
    /// The provider, which fills nonce, gas and chain id and signs
    provider: DynProvider<Ethereum>,
    /// The number of blocks, including the inclusion block, to wait for
    confirmations: u64,
    /// How long to wait for a confirmation before giving up
    timeout: Option<Duration>,
}

impl RpcChainClient {
    /// Wrap a provider, waiting for the default number of confirmations and
    /// without a timeout
    pub fn new(provider: DynProvider<Ethereum>) -> Self {
        Self {
            provider,
            confirmations: NUM_DEPLOY_CONFIRMATIONS,
            timeout: None,
        }
    }

    /// Set the number of confirmations to wait for
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    /// Set the confirmation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The chain id reported by the endpoint
    pub async fn chain_id(&self) -> Result<u64, DeployError> {
        self.provider.get_chain_id().await.map_err(network_error)
    }

    /// The balance, in wei, of the given account
    pub async fn balance(&self, address: Address) -> Result<U256, DeployError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(network_error)
    }

    /// Whether the receipt is buried under enough blocks
    async fn is_confirmed(&self, receipt: &TransactionReceipt) -> Result<bool, DeployError> {
        let Some(included) = receipt.block_number else {
            return Ok(false);
        };
        if self.confirmations <= 1 {
            return Ok(true);
        }

        let head = self
            .provider
            .get_block_number()
            .await
            .map_err(network_error)?;
        Ok(head.saturating_sub(included) + 1 >= self.confirmations)
    }
}

impl ChainClient for RpcChainClient {
    async fn submit_deployment(
        &self,
        signer: &SignerIdentity,
        name: &str,
        code: Bytes,
        value: U256,
    ) -> Result<PendingDeployment, DeployError> {
        let tx = TransactionRequest::default()
            .with_from(signer.address)
            .with_deploy_code(code)
            .with_value(value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(network_error)?;

        let tx_hash = *pending.tx_hash();
        debug!("{name} deployment submitted in {tx_hash}");

        Ok(PendingDeployment {
            name: name.to_string(),
            tx_hash,
        })
    }

    async fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeployedInstance, DeployError> {
        let started = Instant::now();
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(pending.tx_hash)
                .await
                .map_err(network_error)?;

            if let Some(receipt) = receipt {
                if self.is_confirmed(&receipt).await? {
                    return instance_from_receipt(pending, &receipt);
                }
            }

            if self.timeout.is_some_and(|timeout| started.elapsed() >= timeout) {
                return Err(DeployError::DeploymentTimeout(format!(
                    "{} ({})",
                    pending.name, pending.tx_hash
                )));
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// Convert a confirmed receipt into a deployed instance
fn instance_from_receipt(
    pending: PendingDeployment,
    receipt: &TransactionReceipt,
) -> Result<DeployedInstance, DeployError> {
    let reverted = || {
        DeployError::TransactionReverted(format!("{} ({})", pending.name, pending.tx_hash))
    };

    if !receipt.status() {
        return Err(reverted());
    }
    let address = receipt.contract_address.ok_or_else(reverted)?;

    Ok(DeployedInstance {
        name: pending.name,
        address,
        tx_hash: pending.tx_hash,
        block_number: receipt.block_number,
    })
}

/// Classify a transport error
///
/// Nodes reject a creation transaction whose constructor reverts during gas
/// estimation, which surfaces as an error response rather than a receipt.
fn network_error(err: TransportError) -> DeployError {
    match err.as_error_resp() {
        Some(payload) if payload.message.contains("revert") => {
            DeployError::TransactionReverted(payload.message.to_string())
        }
        _ => DeployError::NetworkFailure(err.to_string()),
    }
}
