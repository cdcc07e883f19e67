//! Error taxonomy for configuration, artifacts, chain access and deployments.

use std::path::PathBuf;

use alloy_core::primitives::B256;
use thiserror::Error;

/// Errors raised while resolving a [`crate::NetworkProfile`].
///
/// All of them are fatal and surface before any deployment is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown network '{name}' (known networks: {known})")]
    UnknownNetwork { name: String, known: String },

    #[error("no account credential configured for network '{network}'")]
    MissingCredential { network: String },

    #[error("no RPC endpoint configured for network '{network}'")]
    MissingEndpoint { network: String },

    #[error("invalid RPC endpoint '{value}' for network '{network}': {reason}")]
    InvalidEndpoint {
        network: String,
        value: String,
        reason: String,
    },

    #[error("invalid value '{value}' for '{field}' on network '{network}'")]
    InvalidValue {
        network: String,
        field: &'static str,
        value: String,
    },

    #[error("invalid {kind} credential for network '{network}': {reason}")]
    InvalidCredential {
        network: String,
        kind: &'static str,
        reason: String,
    },

    #[error("failed to load network configuration: {0}")]
    Load(String),
}

/// Errors raised while fetching a compiled contract artifact.
///
/// Any of these aborts the whole run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("no artifact found for contract '{contract}' under {}", root.display())]
    NotFound { contract: String, root: PathBuf },

    #[error("contract name '{contract}' is ambiguous, candidates: {}", format_paths(candidates))]
    Ambiguous {
        contract: String,
        candidates: Vec<PathBuf>,
    },

    #[error("failed to read artifact {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to parse artifact {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("contract '{contract}' has no creation bytecode (abstract contract or interface?)")]
    NotDeployable { contract: String },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors returned by a [`crate::ChainClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("RPC error from {method} (code {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("failed to decode {method} response: {message}")]
    Decode { method: String, message: String },

    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    #[error("endpoint reports chain id {actual}, expected {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("unable to derive deployer account: {0}")]
    Credential(String),

    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

/// Errors recorded against a single plan entry.
///
/// A [`DeploymentError`] halts the remaining plan but never crashes the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeploymentError {
    #[error("submission failed: {0}")]
    Submission(#[source] ChainError),

    #[error("transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: B256, reason: String },

    #[error(
        "transaction {tx_hash} did not reach {required} confirmation(s) within {timeout_secs}s (observed {observed})"
    )]
    ConfirmationTimeout {
        tx_hash: B256,
        required: u64,
        observed: u64,
        timeout_secs: u64,
    },

    #[error("failed to query status of transaction {tx_hash}: {source}")]
    Confirmation {
        tx_hash: B256,
        #[source]
        source: ChainError,
    },

    #[error("runtime bytecode is {size} bytes, above the {limit} byte contract size limit")]
    ContractTooLarge { size: usize, limit: usize },

    #[error("transaction {tx_hash} was confirmed but created no contract")]
    MissingContractAddress { tx_hash: B256 },

    #[error("deployed but failed to persist record: {0}")]
    Persist(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_error_surfaces_chain_error() {
        let err = DeploymentError::Submission(ChainError::Rpc {
            method: "eth_sendRawTransaction".to_string(),
            code: -32000,
            message: "insufficient funds for gas * price + value".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "submission failed: RPC error from eth_sendRawTransaction (code -32000): insufficient funds for gas * price + value"
        );
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = ArtifactError::Ambiguous {
            contract: "Token".to_string(),
            candidates: vec![PathBuf::from("a/Token.json"), PathBuf::from("b/Token.json")],
        };
        assert_eq!(
            err.to_string(),
            "contract name 'Token' is ambiguous, candidates: a/Token.json, b/Token.json"
        );
    }

    #[test]
    fn test_missing_credential_message() {
        let err = ConfigError::MissingCredential {
            network: "goerli".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no account credential configured for network 'goerli'"
        );
    }
}
