//! Resolved network profile.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// How a credential value should be interpreted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CredentialKind {
    #[default]
    PrivateKey,
    Mnemonic,
}

/// An account credential.
///
/// The `Debug` implementation never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A `0x`-prefixed, 32 byte hex-encoded private key.
    PrivateKey(String),
    /// A BIP-39 seed phrase. The deployer is the account at index 0.
    Mnemonic(String),
}

impl Credential {
    /// Valid BIP-39 phrase lengths.
    const MNEMONIC_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

    /// Parse a raw credential, normalising private keys to their `0x`-prefixed form.
    pub fn parse(kind: CredentialKind, raw: &str) -> Result<Self, String> {
        match kind {
            CredentialKind::PrivateKey => {
                let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
                if hex_part.len() != 64 {
                    return Err(format!(
                        "expected 64 hex characters, got {}",
                        hex_part.len()
                    ));
                }
                if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err("contains non-hex characters".to_string());
                }
                Ok(Self::PrivateKey(format!("0x{}", hex_part.to_lowercase())))
            }
            CredentialKind::Mnemonic => {
                let words: Vec<&str> = raw.split_whitespace().collect();
                if !Self::MNEMONIC_WORD_COUNTS.contains(&words.len()) {
                    return Err(format!(
                        "expected 12, 15, 18, 21 or 24 words, got {}",
                        words.len()
                    ));
                }
                Ok(Self::Mnemonic(words.join(" ")))
            }
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::PrivateKey(_) => CredentialKind::PrivateKey,
            Credential::Mnemonic(_) => CredentialKind::Mnemonic,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}

/// Everything needed to submit transactions to one network.
///
/// Built once per invocation by [`crate::resolve`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    /// The network name, as found in the network table.
    pub name: String,
    pub rpc_endpoint: Url,
    pub chain_id: u64,
    /// Deployer accounts; the first one signs deployments.
    pub accounts: Vec<Credential>,
    pub gas_limit: Option<u64>,
    /// Gas price in wei.
    pub gas_price: Option<u128>,
    /// Confirmations to wait for after submission. `0` accepts on submission.
    pub confirmations_required: u64,
    pub persist_records: bool,
    pub allow_unlimited_size: bool,
    /// Whether this is a local development network.
    pub local: bool,
}
