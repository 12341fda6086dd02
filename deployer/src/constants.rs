//! Constants used in the deployer

/// The environment variable holding the Sepolia RPC URL
pub const SEPOLIA_RPC_URL_ENV_VAR: &str = "INFURA_SEPOLIA_URL";

/// The environment variable holding a generic RPC URL, used when the
/// Sepolia URL is not set
pub const RPC_URL_ENV_VAR: &str = "RPC_URL";

/// The environment variable holding the deployer's private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The RPC URL used when no URL is configured
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The default directory containing the compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The subdirectory of the artifacts directory holding contract artifacts
pub const CONTRACTS_ARTIFACTS_SUBDIR: &str = "contracts";

/// The extension of an artifact file
pub const ARTIFACT_EXTENSION: &str = "json";

/// The suffix of the debug files emitted next to each artifact
pub const DEBUG_ARTIFACT_SUFFIX: &str = ".dbg.json";

/// The marker of an unlinked library placeholder in artifact bytecode
pub const LINK_PLACEHOLDER_MARKER: &str = "__$";

/// The prefix marking a constructor argument as the address of an
/// earlier target
pub const ADDRESS_REFERENCE_PREFIX: char = '@';

/// The number of confirmations to wait for the contract deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The name of the time-locked wallet contract
pub const LOCK_CONTRACT_NAME: &str = "Lock";

/// The amount of ether locked in the `Lock` contract at deployment
pub const LOCKED_AMOUNT_ETHER: &str = "0.001";

/// The number of seconds after deployment at which the `Lock` unlocks
pub const LOCK_DURATION_SECS: i64 = 60;

/// The name of the KYC registry contract
pub const KYC_CONTRACT_NAME: &str = "KYCContract";

/// The name of the transaction ledger contract
pub const TRANSACTION_CONTRACT_NAME: &str = "TransactionContract";
