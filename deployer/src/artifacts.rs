//! Loading of compiled contract artifacts and construction of the factories
//! that turn them into deployment bytecode

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Constructor, JsonAbi, StateMutability},
    primitives::Bytes,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    constants::{
        ARTIFACT_EXTENSION, CONTRACTS_ARTIFACTS_SUBDIR, DEBUG_ARTIFACT_SUFFIX,
        LINK_PLACEHOLDER_MARKER,
    },
    errors::DeployError,
};

/// The subset of a Hardhat artifact file needed for deployment
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    /// The contract name
    contract_name: String,
    /// The source file, absent in hand-written artifacts
    #[serde(default)]
    source_name: String,
    /// The contract ABI
    abi: JsonAbi,
    /// The hex-encoded creation bytecode
    bytecode: String,
}

/// A compiled contract: its ABI and creation bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The contract name
    pub name: String,
    /// The source file the contract was compiled from, e.g. `contracts/Lock.sol`
    pub source_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The hex-encoded creation bytecode, possibly with unlinked placeholders
    pub bytecode: String,
}

impl ContractArtifact {
    /// Parse an artifact from the contents of a Hardhat artifact file
    pub fn from_json(contents: &str) -> Result<Self, DeployError> {
        let artifact: HardhatArtifact = serde_json::from_str(contents)
            .map_err(|e| DeployError::ArtifactParsing(e.to_string()))?;

        Ok(Self {
            name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
        })
    }

    /// The fully qualified name of the contract, `<source>:<name>`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.name)
    }

    /// Whether the artifact carries creation code, interfaces and abstract
    /// contracts do not
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.trim_start_matches("0x").is_empty()
    }
}

/// A mapping from contract name to compiled artifact
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    /// Artifacts keyed by contract name; a name compiled from several
    /// sources maps to several artifacts
    artifacts: BTreeMap<String, Vec<ContractArtifact>>,
}

impl ContractRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every deployable artifact under `<artifacts_dir>/contracts`
    ///
    /// A missing directory yields an empty registry, so every lookup
    /// surfaces as an unknown contract.
    pub fn load(artifacts_dir: &Path) -> Result<Self, DeployError> {
        let mut registry = Self::new();
        let contracts_dir = artifacts_dir.join(CONTRACTS_ARTIFACTS_SUBDIR);
        if !contracts_dir.is_dir() {
            warn!("no artifacts found at {}", contracts_dir.display());
            return Ok(registry);
        }

        let mut files = Vec::new();
        collect_artifact_files(&contracts_dir, &mut files)?;
        files.sort();

        for path in files {
            let contents = fs::read_to_string(&path)
                .map_err(|e| DeployError::ArtifactParsing(format!("{}: {e}", path.display())))?;
            let artifact = ContractArtifact::from_json(&contents).map_err(|e| {
                DeployError::ArtifactParsing(format!("{}: {e}", path.display()))
            })?;

            if !artifact.is_deployable() {
                debug!("skipping {}, no creation bytecode", artifact.qualified_name());
                continue;
            }
            registry.insert(artifact);
        }

        Ok(registry)
    }

    /// Add an artifact to the registry
    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.artifacts
            .entry(artifact.name.clone())
            .or_default()
            .push(artifact);
    }

    /// The names of all contracts in the registry, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Whether the registry holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Look up the artifact for a contract name
    ///
    /// The name may be fully qualified (`contracts/Lock.sol:Lock`), which is
    /// required when several sources define a contract with the same name.
    pub fn artifact(&self, name: &str) -> Result<&ContractArtifact, DeployError> {
        let (source, contract) = match name.rsplit_once(':') {
            Some((source, contract)) => (Some(source), contract),
            None => (None, name),
        };

        let candidates = self
            .artifacts
            .get(contract)
            .ok_or_else(|| DeployError::UnknownContract(name.to_string()))?;

        match source {
            Some(source) => candidates
                .iter()
                .find(|a| a.source_name == source)
                .ok_or_else(|| DeployError::UnknownContract(name.to_string())),
            None => match candidates.as_slice() {
                [artifact] => Ok(artifact),
                _ => {
                    let qualified: Vec<String> =
                        candidates.iter().map(|a| a.qualified_name()).collect();
                    Err(DeployError::ArtifactParsing(format!(
                        "multiple artifacts named {name}, use one of: {}",
                        qualified.join(", ")
                    )))
                }
            },
        }
    }

    /// Build the factory that deploys the named contract
    pub fn factory(&self, name: &str) -> Result<ContractFactory, DeployError> {
        ContractFactory::new(self.artifact(name)?)
    }
}

/// Recursively collect the artifact files under `dir`, skipping debug files
fn collect_artifact_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DeployError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| DeployError::ArtifactParsing(format!("{}: {e}", dir.display())))?;

    for entry in entries {
        let path = entry
            .map_err(|e| DeployError::ArtifactParsing(e.to_string()))?
            .path();

        if path.is_dir() {
            collect_artifact_files(&path, files)?;
            continue;
        }

        let is_debug = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(DEBUG_ARTIFACT_SUFFIX));
        let is_json = path
            .extension()
            .is_some_and(|ext| ext == ARTIFACT_EXTENSION);

        if is_json && !is_debug {
            files.push(path);
        }
    }

    Ok(())
}

/// The capability to build deployment bytecode for a single contract
#[derive(Debug, Clone)]
pub struct ContractFactory {
    /// The contract name
    name: String,
    /// The constructor, absent when the contract declares none
    constructor: Option<Constructor>,
    /// The creation bytecode
    bytecode: Bytes,
}

impl ContractFactory {
    /// Build a factory from a compiled artifact
    pub fn new(artifact: &ContractArtifact) -> Result<Self, DeployError> {
        if artifact.bytecode.contains(LINK_PLACEHOLDER_MARKER) {
            return Err(DeployError::ArtifactParsing(format!(
                "{} requires library linking, which is not supported",
                artifact.name
            )));
        }
        if !artifact.is_deployable() {
            return Err(DeployError::ArtifactParsing(format!(
                "{} has no creation bytecode",
                artifact.name
            )));
        }

        let bytecode: Bytes = artifact
            .bytecode
            .parse()
            .map_err(|e| DeployError::ArtifactParsing(format!("{}: {e}", artifact.name)))?;

        Ok(Self {
            name: artifact.name.clone(),
            constructor: artifact.abi.constructor.clone(),
            bytecode,
        })
    }

    /// The name of the contract this factory deploys
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the constructor accepts value
    pub fn is_payable(&self) -> bool {
        self.constructor
            .as_ref()
            .is_some_and(|c| c.state_mutability == StateMutability::Payable)
    }

    /// The resolved ABI types of the constructor parameters
    pub fn constructor_types(&self) -> Result<Vec<DynSolType>, DeployError> {
        let Some(constructor) = &self.constructor else {
            return Ok(Vec::new());
        };

        constructor
            .inputs
            .iter()
            .map(|param| {
                param
                    .resolve()
                    .map_err(|e| DeployError::ArtifactParsing(format!("{}: {e}", self.name)))
            })
            .collect()
    }

    /// The creation bytecode followed by the ABI-encoded constructor arguments
    pub fn deploy_code(&self, args: &[DynSolValue]) -> Result<Bytes, DeployError> {
        let mut code = self.bytecode.to_vec();
        match &self.constructor {
            Some(constructor) => {
                let encoded = constructor
                    .abi_encode_input(args)
                    .map_err(|e| DeployError::CalldataConstruction(format!("{}: {e}", self.name)))?;
                code.extend_from_slice(&encoded);
            }
            None if args.is_empty() => {}
            None => {
                return Err(DeployError::CalldataConstruction(format!(
                    "{} has no constructor but {} arguments were given",
                    self.name,
                    args.len()
                )));
            }
        }

        Ok(code.into())
    }
}

#[cfg(test)]
mod tests {
    use alloy::{dyn_abi::DynSolValue, primitives::U256};

    use super::{ContractArtifact, ContractRegistry};
    use crate::errors::DeployError;

    /// A trimmed Hardhat artifact for a payable contract taking a `uint256`
    const LOCK_ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "Lock",
        "sourceName": "contracts/Lock.sol",
        "abi": [
            {
                "inputs": [{ "internalType": "uint256", "name": "_unlockTime", "type": "uint256" }],
                "stateMutability": "payable",
                "type": "constructor"
            }
        ],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080",
        "linkReferences": {},
        "deployedLinkReferences": {}
    }"#;

    /// An interface artifact, which has no creation code
    const INTERFACE_ARTIFACT: &str = r#"{
        "contractName": "IKyc",
        "sourceName": "contracts/IKyc.sol",
        "abi": [],
        "bytecode": "0x"
    }"#;

    fn write(dir: &std::path::Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_skips_debug_and_abstract_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "contracts/Lock.sol/Lock.json", LOCK_ARTIFACT);
        write(dir.path(), "contracts/Lock.sol/Lock.dbg.json", "{}");
        write(dir.path(), "contracts/IKyc.sol/IKyc.json", INTERFACE_ARTIFACT);

        let registry = ContractRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Lock"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ContractRegistry::load(&dir.path().join("nope")).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            registry.factory("Lock").unwrap_err(),
            DeployError::UnknownContract("Lock".to_string())
        );
    }

    #[test]
    fn test_deploy_code_appends_constructor_args() {
        let mut registry = ContractRegistry::new();
        registry.insert(ContractArtifact::from_json(LOCK_ARTIFACT).unwrap());

        let factory = registry.factory("Lock").unwrap();
        assert!(factory.is_payable());

        let code = factory
            .deploy_code(&[DynSolValue::Uint(U256::from(42), 256)])
            .unwrap();
        assert_eq!(code.len(), 5 + 32);
        assert_eq!(code[code.len() - 1], 42);
    }

    #[test]
    fn test_deploy_code_rejects_wrong_arity() {
        let mut registry = ContractRegistry::new();
        registry.insert(ContractArtifact::from_json(LOCK_ARTIFACT).unwrap());

        let err = registry.factory("Lock").unwrap().deploy_code(&[]).unwrap_err();
        assert!(matches!(err, DeployError::CalldataConstruction(_)));
    }

    #[test]
    fn test_qualified_lookup_disambiguates() {
        let mut registry = ContractRegistry::new();
        let first = ContractArtifact::from_json(LOCK_ARTIFACT).unwrap();
        let mut second = first.clone();
        second.source_name = "contracts/legacy/Lock.sol".to_string();
        registry.insert(first);
        registry.insert(second);

        assert!(matches!(
            registry.artifact("Lock"),
            Err(DeployError::ArtifactParsing(_))
        ));
        let artifact = registry.artifact("contracts/legacy/Lock.sol:Lock").unwrap();
        assert_eq!(artifact.source_name, "contracts/legacy/Lock.sol");
    }

    #[test]
    fn test_unlinked_bytecode_is_rejected() {
        let mut artifact = ContractArtifact::from_json(LOCK_ARTIFACT).unwrap();
        artifact.bytecode = "0x73__$abcdef$__6080".to_string();

        let mut registry = ContractRegistry::new();
        registry.insert(artifact);
        assert!(matches!(
            registry.factory("Lock"),
            Err(DeployError::ArtifactParsing(_))
        ));
    }
}
