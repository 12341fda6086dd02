//! Utilities for the deployer

use std::{fs, path::Path, str::FromStr};

use alloy::{
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use serde_json::{Map, Value};

use crate::{
    client::RpcChainClient,
    constants::{DEPLOYMENTS_KEY, PRIVATE_KEY_ENV_VAR},
    errors::DeployError,
    types::SignerIdentity,
};

/// Parse the deployer's private key
///
/// An empty key means no account is configured.
pub fn parse_signer(priv_key: &str) -> Result<PrivateKeySigner, DeployError> {
    let priv_key = priv_key.trim();
    if priv_key.is_empty() {
        return Err(DeployError::SignerUnavailable(format!(
            "no private key configured, set {PRIVATE_KEY_ENV_VAR}"
        )));
    }

    PrivateKeySigner::from_str(priv_key)
        .map_err(|e| DeployError::SignerUnavailable(format!("invalid private key: {e}")))
}

/// Sets up the chain client and the identity of the account it signs for,
/// from the private key and RPC url
pub fn setup_client(
    priv_key: &str,
    rpc_url: &str,
) -> Result<(RpcChainClient, SignerIdentity), DeployError> {
    let signer = parse_signer(priv_key)?;
    let identity = SignerIdentity::from_signer(&signer);

    let url =
        Url::parse(rpc_url).map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

    Ok((RpcChainClient::new(DynProvider::new(provider)), identity))
}

/// Parse the `deployments` section of a deployments file
fn parse_deployments(contents: &str) -> Result<Vec<(String, Address)>, DeployError> {
    let parsed: Value =
        serde_json::from_str(contents).map_err(|e| DeployError::ReadDeployments(e.to_string()))?;

    let Some(deployments) = parsed.get(DEPLOYMENTS_KEY) else {
        return Ok(Vec::new());
    };
    let deployments = deployments.as_object().ok_or_else(|| {
        DeployError::ReadDeployments(format!("`{DEPLOYMENTS_KEY}` is not an object"))
    })?;

    deployments
        .iter()
        .map(|(name, address)| {
            let address = address
                .as_str()
                .ok_or_else(|| DeployError::ReadDeployments(format!("{name} is not a string")))?;
            let address = Address::from_str(address)
                .map_err(|e| DeployError::ReadDeployments(format!("{name}: {e}")))?;
            Ok((name.clone(), address))
        })
        .collect()
}

/// Read the addresses recorded in a deployments file, a missing file has none
pub fn read_deployments(file_path: &Path) -> Result<Vec<(String, Address)>, DeployError> {
    if !file_path.exists() {
        return Ok(Vec::new());
    }

    let contents =
        fs::read_to_string(file_path).map_err(|e| DeployError::ReadDeployments(e.to_string()))?;
    parse_deployments(&contents)
}

/// Record a deployed address in the deployments file, creating the file if
/// needed and keeping any other entries
pub fn write_deployed_address(
    file_path: &Path,
    contract_key: &str,
    address: Address,
) -> Result<(), DeployError> {
    let mut parsed: Value = if file_path.exists() {
        let contents = fs::read_to_string(file_path)
            .map_err(|e| DeployError::ReadDeployments(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| DeployError::ReadDeployments(e.to_string()))?
    } else {
        Value::Object(Map::new())
    };

    let root = parsed.as_object_mut().ok_or_else(|| {
        DeployError::WriteDeployments("deployments file is not a JSON object".to_string())
    })?;
    let deployments = root
        .entry(DEPLOYMENTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            DeployError::WriteDeployments(format!("`{DEPLOYMENTS_KEY}` is not an object"))
        })?;
    deployments.insert(
        contract_key.to_string(),
        Value::String(format!("{address:#x}")),
    );

    let contents = serde_json::to_string_pretty(&parsed)
        .map_err(|e| DeployError::WriteDeployments(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| DeployError::WriteDeployments(e.to_string()))
}
