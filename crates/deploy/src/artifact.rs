//! Compiled contract artifacts.
//!
//! [`FsArtifacts`] reads the JSON artifacts written by Hardhat
//! (`artifacts/contracts/Token.sol/Token.json`) or Foundry
//! (`out/Token.sol/Token.json`).

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_core::primitives::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::ArtifactError;

/// Maximum runtime bytecode size accepted by Ethereum mainnet (EIP-170).
pub const MAX_RUNTIME_SIZE: usize = 24_576;

/// Maximum creation bytecode size accepted by Ethereum mainnet (EIP-3860).
pub const MAX_INIT_SIZE: usize = 2 * MAX_RUNTIME_SIZE;

/// A compiled contract, ready to be deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub contract_name: String,
    /// Creation bytecode, sent as the deployment transaction data.
    pub bytecode: Bytes,
    /// Runtime bytecode, as stored on-chain after deployment.
    pub deployed_bytecode: Bytes,
}

impl Artifact {
    /// SHA-256 fingerprint of the creation bytecode, hex-encoded.
    pub fn bytecode_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytecode);
        hex::encode(hasher.finalize())
    }

    /// Runtime size in bytes, falling back to the creation size when the
    /// artifact carries no runtime bytecode.
    pub fn runtime_size(&self) -> usize {
        if self.deployed_bytecode.is_empty() {
            self.bytecode.len()
        } else {
            self.deployed_bytecode.len()
        }
    }

    pub fn init_size(&self) -> usize {
        self.bytecode.len()
    }
}

/// Provides compiled artifacts by contract name.
pub trait ArtifactSource {
    fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError>;
}

/// Artifact JSON as written by Hardhat or Foundry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    bytecode: BytecodeField,
    #[serde(default)]
    deployed_bytecode: Option<BytecodeField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    /// Hardhat: `"bytecode": "0x..."`
    Hex(String),
    /// Foundry: `"bytecode": { "object": "0x...", ... }`
    Object { object: String },
}

impl BytecodeField {
    fn decode(&self, path: &Path) -> Result<Bytes, ArtifactError> {
        let hex = match self {
            BytecodeField::Hex(hex) => hex,
            BytecodeField::Object { object } => object,
        };

        // Unlinked library references look like `__$<hash>$__`.
        if hex.contains("__") {
            return Err(ArtifactError::Parse {
                path: path.to_path_buf(),
                reason: "bytecode contains unlinked library references".to_string(),
            });
        }

        Bytes::from_str(hex).map_err(|e| ArtifactError::Parse {
            path: path.to_path_buf(),
            reason: format!("invalid bytecode hex: {}", e),
        })
    }
}

/// Artifacts stored on disk below a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    root: PathBuf,
}

impl FsArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every artifact file named `<contract_name>.json` below the root.
    fn find(&self, contract_name: &str) -> Result<Vec<PathBuf>, ArtifactError> {
        // Fully qualified name: `contracts/Token.sol:Token`.
        if let Some((source, name)) = contract_name.split_once(':') {
            let path = self.root.join(source).join(format!("{}.json", name));
            return Ok(if path.is_file() { vec![path] } else { vec![] });
        }

        let file_name = format!("{}.json", contract_name);
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| ArtifactError::Read {
                path: dir.clone(),
                reason: e.to_string(),
            })?;

            for entry in entries {
                let entry = entry.map_err(|e| ArtifactError::Read {
                    path: dir.clone(),
                    reason: e.to_string(),
                })?;
                let path = entry.path();

                if path.is_dir() {
                    if entry.file_name() != "build-info" {
                        pending.push(path);
                    }
                } else if entry.file_name().to_string_lossy() == file_name {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

impl ArtifactSource for FsArtifacts {
    fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError> {
        if !self.root.is_dir() {
            return Err(ArtifactError::NotFound {
                contract: contract_name.to_string(),
                root: self.root.clone(),
            });
        }

        let mut candidates = self.find(contract_name)?;
        let path = match candidates.len() {
            0 => {
                return Err(ArtifactError::NotFound {
                    contract: contract_name.to_string(),
                    root: self.root.clone(),
                });
            }
            1 => candidates.remove(0),
            _ => {
                return Err(ArtifactError::Ambiguous {
                    contract: contract_name.to_string(),
                    candidates,
                });
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| ArtifactError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let file: ArtifactFile =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let bytecode = file.bytecode.decode(&path)?;
        if bytecode.is_empty() {
            return Err(ArtifactError::NotDeployable {
                contract: contract_name.to_string(),
            });
        }
        let deployed_bytecode = file
            .deployed_bytecode
            .map(|field| field.decode(&path))
            .transpose()?
            .unwrap_or_default();

        tracing::debug!(
            contract = contract_name,
            path = %path.display(),
            init_size = bytecode.len(),
            runtime_size = deployed_bytecode.len(),
            "Artifact loaded"
        );

        Ok(Artifact {
            contract_name: contract_name.to_string(),
            bytecode,
            deployed_bytecode,
        })
    }
}
