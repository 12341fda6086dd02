//! Deployment plans: the built-in target sequences and plan files

use std::{fs, path::Path};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{utils::parse_ether, U256},
};
use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    constants::{
        ADDRESS_REFERENCE_PREFIX, KYC_CONTRACT_NAME, LOCKED_AMOUNT_ETHER, LOCK_CONTRACT_NAME,
        LOCK_DURATION_SECS, TRANSACTION_CONTRACT_NAME,
    },
    errors::DeployError,
    types::{ConstructorArg, DeploymentTarget},
};

/// The built-in deployment plans
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Plan {
    /// A `Lock` holding 0.001 ether, unlocking a minute after deployment
    #[default]
    Lock,
    /// The `KYCContract` followed by the `TransactionContract`
    Kyc,
}

impl Plan {
    /// The targets of the plan, timestamped at `now`
    pub fn targets(self, now: DateTime<Utc>) -> Result<Vec<DeploymentTarget>, DeployError> {
        match self {
            Plan::Lock => Ok(vec![lock_target(now)?]),
            Plan::Kyc => Ok(kyc_targets()),
        }
    }
}

/// The `Lock` target: `constructor(uint256 unlockTime)` funded with the locked amount
pub fn lock_target(now: DateTime<Utc>) -> Result<DeploymentTarget, DeployError> {
    let unlock_time = (now + Duration::seconds(LOCK_DURATION_SECS)).timestamp();
    let unlock_time = u64::try_from(unlock_time)
        .map_err(|_| DeployError::CalldataConstruction(format!("bad unlock time {unlock_time}")))?;

    Ok(DeploymentTarget::new(LOCK_CONTRACT_NAME)
        .with_arg(DynSolValue::Uint(U256::from(unlock_time), 256))
        .with_value(locked_amount()?))
}

/// The amount of wei locked in the `Lock` contract
pub fn locked_amount() -> Result<U256, DeployError> {
    parse_ether(LOCKED_AMOUNT_ETHER).map_err(|e| DeployError::CalldataConstruction(e.to_string()))
}

/// The KYC registry followed by the transaction ledger
pub fn kyc_targets() -> Vec<DeploymentTarget> {
    vec![
        DeploymentTarget::new(KYC_CONTRACT_NAME),
        DeploymentTarget::new(TRANSACTION_CONTRACT_NAME),
    ]
}

/// A plan file: `{"targets": [{"name": .., "args": [..], "value": ".."}]}`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    /// The targets, in deployment order
    targets: Vec<PlanFileTarget>,
}

/// A single target of a plan file
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFileTarget {
    /// The contract name
    name: String,
    /// The constructor arguments
    #[serde(default)]
    args: Vec<Value>,
    /// Decimal ether
    #[serde(default)]
    value: Option<String>,
}

/// Parse the targets of a plan file
///
/// Arguments are coerced against the constructor ABI when the run is
/// validated; a string starting with `@` is the address of the named
/// earlier target.
pub fn parse_plan(contents: &str) -> Result<Vec<DeploymentTarget>, DeployError> {
    let plan: PlanFile =
        serde_json::from_str(contents).map_err(|e| DeployError::ReadPlan(e.to_string()))?;

    plan.targets
        .into_iter()
        .map(|target| {
            let value = match &target.value {
                Some(ether) => parse_ether(ether)
                    .map_err(|e| DeployError::ReadPlan(format!("{}: {e}", target.name)))?,
                None => U256::ZERO,
            };
            let args = target
                .args
                .into_iter()
                .map(|arg| plan_arg(&target.name, arg))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(DeploymentTarget {
                name: target.name,
                args,
                value,
            })
        })
        .collect()
}

/// Read and parse a plan file
pub fn read_plan(path: &Path) -> Result<Vec<DeploymentTarget>, DeployError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DeployError::ReadPlan(format!("{}: {e}", path.display())))?;
    parse_plan(&contents)
}

/// Convert a plan file argument into a constructor argument
///
/// JSON numbers outside the 64-bit range lose precision when parsed, so
/// larger integers must be given as strings.
fn plan_arg(target: &str, arg: Value) -> Result<ConstructorArg, DeployError> {
    match arg {
        Value::String(s) => match s.strip_prefix(ADDRESS_REFERENCE_PREFIX) {
            Some(reference) => Ok(ConstructorArg::AddressOf(reference.to_string())),
            None => Ok(ConstructorArg::Raw(s)),
        },
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(ConstructorArg::Raw(n.to_string())),
        Value::Number(n) => Err(DeployError::ReadPlan(format!(
            "{target}: number {n} is not a 64-bit integer, use a string"
        ))),
        Value::Bool(b) => Ok(ConstructorArg::Raw(b.to_string())),
        other => Err(DeployError::ReadPlan(format!(
            "{target}: unsupported argument {other}, use a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use alloy::{dyn_abi::DynSolValue, primitives::U256};
    use chrono::{TimeZone, Utc};

    use super::{lock_target, parse_plan, Plan};
    use crate::{
        errors::DeployError,
        types::{ConstructorArg, DeploymentTarget},
    };

    #[test]
    fn test_lock_unlocks_a_minute_later() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let target = lock_target(now).unwrap();

        assert_eq!(target.name, "Lock");
        assert_eq!(
            target.args,
            vec![ConstructorArg::Value(DynSolValue::Uint(
                U256::from(1_700_000_060u64),
                256
            ))]
        );
        assert_eq!(target.value, U256::from(1_000_000_000_000_000u64));
    }

    #[test]
    fn test_kyc_plan_order() {
        let names: Vec<String> = Plan::Kyc
            .targets(Utc::now())
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["KYCContract", "TransactionContract"]);
    }

    #[test]
    fn test_parse_plan_file() {
        let targets = parse_plan(
            r#"{
                "targets": [
                    { "name": "KYCContract" },
                    { "name": "TransactionContract", "args": ["@KYCContract", 7, true], "value": "0.5" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(targets[0], DeploymentTarget::new("KYCContract"));
        assert_eq!(
            targets[1].args,
            vec![
                ConstructorArg::AddressOf("KYCContract".to_string()),
                ConstructorArg::Raw("7".to_string()),
                ConstructorArg::Raw("true".to_string()),
            ]
        );
        assert_eq!(targets[1].value, U256::from(500_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_plan_rejects_wide_numbers() {
        let err = parse_plan(
            r#"{ "targets": [{ "name": "Lock", "args": [1000000000000000000000] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeployError::ReadPlan(msg) if msg.contains("use a string")));

        let targets = parse_plan(
            r#"{ "targets": [{ "name": "Lock", "args": ["1000000000000000000000", -1] }] }"#,
        )
        .unwrap();
        assert_eq!(
            targets[0].args,
            vec![
                ConstructorArg::Raw("1000000000000000000000".to_string()),
                ConstructorArg::Raw("-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_plan_rejects_bad_value() {
        let err = parse_plan(r#"{ "targets": [{ "name": "Lock", "value": "lots" }] }"#).unwrap_err();
        assert!(matches!(err, DeployError::ReadPlan(_)));
    }
}
