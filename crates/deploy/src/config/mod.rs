//! Network configuration.
//!
//! A [`NetworkTable`] describes, for every known network, the ordered list of
//! candidate sources for each profile field. The table starts from the
//! built-in networks and is layered with an optional `Chainship.toml` file and
//! `CHAINSHIP_`-prefixed environment overrides. [`resolve`] then turns one
//! entry of the table into a concrete [`NetworkProfile`].

mod profile;
mod resolver;

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub use profile::{Credential, CredentialKind, NetworkProfile};
pub use resolver::{ConfigInputs, ProcessEnv, resolve};

use crate::ConfigError;

/// The default name for the chainship configuration file.
pub const CONFIG_FILENAME: &str = "Chainship.toml";

/// Prefix for environment variables overriding the network table.
pub const ENV_PREFIX: &str = "CHAINSHIP_";

/// The network used when none is selected.
pub const DEFAULT_NETWORK: &str = "hardhat";

/// Default endpoint of a local development node.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Chain id used by local development nodes (Hardhat, Anvil).
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Well-known development mnemonic whose accounts are pre-funded on local nodes.
pub const LOCAL_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Where a configuration value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    /// Read the value from the named external input (environment variable).
    Env { env: String },
    /// Use the given value as-is.
    Literal { value: String },
}

impl Source {
    pub fn env(key: impl Into<String>) -> Self {
        Self::Env { env: key.into() }
    }

    pub fn literal(value: impl ToString) -> Self {
        Self::Literal {
            value: value.to_string(),
        }
    }

    /// Returns the value of this source if it is present and non-empty.
    pub fn lookup(&self, inputs: &impl ConfigInputs) -> Option<String> {
        let raw = match self {
            Source::Env { env } => inputs.lookup(env)?,
            Source::Literal { value } => value.clone(),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Env { env } => write!(f, "env:{}", env),
            Source::Literal { .. } => write!(f, "literal"),
        }
    }
}

/// A candidate source for an account credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialSource {
    #[serde(flatten)]
    pub source: Source,
    /// How the resolved value must be interpreted.
    #[serde(default)]
    pub kind: CredentialKind,
}

impl CredentialSource {
    pub fn private_key(source: Source) -> Self {
        Self {
            source,
            kind: CredentialKind::PrivateKey,
        }
    }

    pub fn mnemonic(source: Source) -> Self {
        Self {
            source,
            kind: CredentialKind::Mnemonic,
        }
    }
}

/// Candidate sources for every field of a network profile.
///
/// Within each list, the first present and non-empty value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSpec {
    /// Local development networks accept safe defaults and need no credentials.
    pub local: bool,
    pub rpc_url: Vec<Source>,
    pub accounts: Vec<CredentialSource>,
    pub chain_id: Vec<Source>,
    pub gas_limit: Vec<Source>,
    pub gas_price: Vec<Source>,
    pub confirmations: Vec<Source>,
    /// Write successful deployments to the record store.
    pub persist_records: bool,
    /// Skip the EIP-170 runtime bytecode size check.
    pub allow_unlimited_size: bool,
}

impl NetworkSpec {
    /// A local development network with the given chain id.
    fn local(chain_id: u64) -> Self {
        Self {
            local: true,
            chain_id: vec![Source::literal(chain_id)],
            ..Default::default()
        }
    }

    /// A remote network, with per-network env overrides for chain id, gas and confirmations.
    ///
    /// For a network named `polygon` the override keys are `POLYGON_CHAIN_ID`,
    /// `POLYGON_GAS_LIMIT`, `POLYGON_GAS_PRICE` and `POLYGON_CONFIRMATIONS`.
    fn remote(name: &str, chain_id: u64) -> Self {
        let key = |suffix: &str| format!("{}_{}", name.to_uppercase(), suffix);
        Self {
            local: false,
            chain_id: vec![Source::env(key("CHAIN_ID")), Source::literal(chain_id)],
            gas_limit: vec![Source::env(key("GAS_LIMIT"))],
            gas_price: vec![Source::env(key("GAS_PRICE"))],
            confirmations: vec![Source::env(key("CONFIRMATIONS"))],
            persist_records: true,
            ..Default::default()
        }
    }
}

/// All networks known to this invocation, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTable {
    /// Network used when the caller does not select one.
    #[serde(default = "default_network")]
    pub default_network: String,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSpec>,
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NetworkTable {
    /// The networks available without any configuration file.
    pub fn builtin() -> Self {
        let mut networks = BTreeMap::new();

        networks.insert("hardhat".to_string(), NetworkSpec::local(LOCAL_CHAIN_ID));
        networks.insert(
            "localhost".to_string(),
            NetworkSpec {
                rpc_url: vec![Source::literal(LOCAL_RPC_URL)],
                ..NetworkSpec::local(LOCAL_CHAIN_ID)
            },
        );

        let mut goerli = NetworkSpec::remote("goerli", 5);
        goerli.rpc_url = vec![Source::env("SPEEDY_NODE")];
        goerli.accounts = vec![CredentialSource::private_key(Source::env("ACCOUNT"))];
        goerli.confirmations.push(Source::literal(6));
        goerli.gas_limit.push(Source::literal(2_100_000));
        goerli.gas_price.push(Source::literal(20_000_000_000u64));
        goerli.allow_unlimited_size = true;
        networks.insert("goerli".to_string(), goerli);

        let mut mainnet = NetworkSpec::remote("mainnet", 1);
        mainnet.rpc_url = vec![Source::env("MAINNET_RPC_URL"), Source::env("SPEEDY_NODE")];
        mainnet.accounts = vec![
            CredentialSource::private_key(Source::env("ACCOUNT")),
            CredentialSource::mnemonic(Source::env("MNEMONIC")),
        ];
        networks.insert("mainnet".to_string(), mainnet);

        let mut polygon = NetworkSpec::remote("polygon", 137);
        polygon.rpc_url = vec![Source::env("POLYGON_MAINNET_RPC_URL")];
        polygon.accounts = vec![
            CredentialSource::private_key(Source::env("ACCOUNT")),
            CredentialSource::mnemonic(Source::env("MNEMONIC")),
        ];
        networks.insert("polygon".to_string(), polygon);

        Self {
            default_network: default_network(),
            networks,
        }
    }

    /// Load the network table.
    ///
    /// Layers, lowest precedence first:
    /// 1. the built-in networks,
    /// 2. the TOML file at `path` (or `./Chainship.toml` if it exists),
    /// 3. `CHAINSHIP_`-prefixed environment variables, with `__` separating
    ///    nested keys (e.g. `CHAINSHIP_NETWORKS__GOERLI__PERSIST_RECORDS=false`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Load(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                if path.is_dir() {
                    path.join(CONFIG_FILENAME)
                } else {
                    path.to_path_buf()
                }
            }
            None => PathBuf::from(CONFIG_FILENAME),
        };

        let table: Self = Figment::from(Serialized::defaults(Self::builtin()))
            .merge(Toml::file(&config_path))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .filter(|key| {
                        let key = key.as_str().to_ascii_lowercase();
                        key.starts_with("networks") || key == "default_network"
                    }),
            )
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        tracing::debug!(
            path = %config_path.display(),
            networks = table.networks.len(),
            default_network = %table.default_network,
            "Network table loaded"
        );

        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&NetworkSpec> {
        self.networks.get(name)
    }

    /// Comma-separated list of known network names, for error messages.
    pub fn known_networks(&self) -> String {
        self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
