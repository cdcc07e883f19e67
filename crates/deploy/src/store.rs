//! Persisted deployment records.

use std::path::{Component, Path, PathBuf};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A successful deployment as written to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDeployment {
    pub contract_name: String,
    pub address: Address,
    pub transaction_hash: B256,
    pub chain_id: u64,
    /// SHA-256 of the creation bytecode that was deployed.
    pub bytecode_hash: String,
    /// Unix timestamp (seconds) of the deployment.
    pub deployed_at: i64,
    /// Chainship version that performed the deployment.
    pub chainship_version: String,
}

impl StoredDeployment {
    pub fn new(
        contract_name: impl Into<String>,
        address: Address,
        transaction_hash: B256,
        chain_id: u64,
        bytecode_hash: String,
    ) -> Self {
        Self {
            contract_name: contract_name.into(),
            address,
            transaction_hash,
            chain_id,
            bytecode_hash,
            deployed_at: chrono::Utc::now().timestamp(),
            chainship_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Durable store of deployments, keyed by `(network, contract)`.
pub trait RecordStore: Send + Sync {
    fn save(&self, network: &str, record: &StoredDeployment) -> Result<()>;

    fn load(&self, network: &str, contract_name: &str) -> Result<Option<StoredDeployment>>;
}

/// Stores each record as `<root>/<network>/<contract>.json`.
///
/// A fully qualified name (`contracts/Token.sol:Token`) keeps its source path:
/// `<root>/<network>/contracts/Token.sol/Token.json`.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, network: &str, contract_name: &str) -> PathBuf {
        let mut path = self.root.join(network);
        let name = match contract_name.rsplit_once(':') {
            Some((source, name)) => {
                // Only plain components, so a record never lands outside its network directory.
                for component in Path::new(source).components() {
                    if let Component::Normal(part) = component {
                        path.push(part);
                    }
                }
                name
            }
            None => contract_name,
        };
        path.join(format!("{}.json", name))
    }
}

impl RecordStore for FsRecordStore {
    fn save(&self, network: &str, record: &StoredDeployment) -> Result<()> {
        let path = self.record_path(network, &record.contract_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create deployments directory {}",
                parent.display()
            ))?;
        }

        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize deployment record")?;
        std::fs::write(&path, json)
            .context(format!("Failed to write deployment record to {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Deployment record saved");
        Ok(())
    }

    fn load(&self, network: &str, contract_name: &str) -> Result<Option<StoredDeployment>> {
        let path = self.record_path(network, contract_name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read deployment record from {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .context(format!("Failed to parse deployment record {}", path.display()))?;

        Ok(Some(record))
    }
}
