//! Pure resolution of a [`NetworkProfile`] from a [`NetworkTable`] entry.

use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
};

use url::Url;

use super::{
    Credential, CredentialKind, LOCAL_CHAIN_ID, LOCAL_MNEMONIC, LOCAL_RPC_URL, NetworkProfile,
    NetworkTable, Source,
};
use crate::ConfigError;

/// Confirmations waited for when a network does not configure any.
const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Named external inputs consulted by [`Source::Env`].
pub trait ConfigInputs {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl ConfigInputs for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigInputs for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigInputs for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Returns the first present, non-empty value among `sources`, in declared order.
fn first_present<'a, I>(
    network: &str,
    field: &'static str,
    sources: I,
    inputs: &impl ConfigInputs,
) -> Option<String>
where
    I: IntoIterator<Item = &'a Source>,
{
    sources.into_iter().find_map(|source| {
        let value = source.lookup(inputs)?;
        tracing::debug!(network, field, %source, "Resolved configuration value");
        Some(value)
    })
}

fn parse_number<T: FromStr>(
    network: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value.replace('_', "").parse::<T>().map_err(|_| ConfigError::InvalidValue {
                network: network.to_string(),
                field,
                value,
            })
        })
        .transpose()
}

/// Resolve the profile of network `name`.
///
/// Every field is taken from the first present, non-empty candidate of its
/// source list. Non-local networks must resolve both an RPC endpoint and a
/// credential. Local networks fall back to a local node with the development
/// mnemonic. No I/O is performed besides calls to `inputs`, and no partial
/// profile is ever returned.
pub fn resolve(
    name: &str,
    table: &NetworkTable,
    inputs: &impl ConfigInputs,
) -> Result<NetworkProfile, ConfigError> {
    let spec = table.get(name).ok_or_else(|| ConfigError::UnknownNetwork {
        name: name.to_string(),
        known: table.known_networks(),
    })?;

    let credential = spec.accounts.iter().find_map(|candidate| {
        let value = candidate.source.lookup(inputs)?;
        tracing::debug!(
            network = name,
            field = "accounts",
            source = %candidate.source,
            kind = %candidate.kind,
            "Resolved configuration value"
        );
        Some((candidate.kind, value))
    });
    let (kind, raw_credential) = match (credential, spec.local) {
        (Some(credential), _) => credential,
        (None, true) => (CredentialKind::Mnemonic, LOCAL_MNEMONIC.to_string()),
        (None, false) => {
            return Err(ConfigError::MissingCredential {
                network: name.to_string(),
            });
        }
    };

    let rpc_url = first_present(name, "rpc_url", &spec.rpc_url, inputs);
    let rpc_url = match (rpc_url, spec.local) {
        (Some(url), _) => url,
        (None, true) => LOCAL_RPC_URL.to_string(),
        (None, false) => {
            return Err(ConfigError::MissingEndpoint {
                network: name.to_string(),
            });
        }
    };

    let rpc_endpoint = Url::parse(&rpc_url).map_err(|e| ConfigError::InvalidEndpoint {
        network: name.to_string(),
        value: rpc_url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(rpc_endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEndpoint {
            network: name.to_string(),
            value: rpc_url,
            reason: format!("unsupported scheme '{}'", rpc_endpoint.scheme()),
        });
    }

    let credential =
        Credential::parse(kind, &raw_credential).map_err(|reason| ConfigError::InvalidCredential {
            network: name.to_string(),
            kind: match kind {
                CredentialKind::PrivateKey => "private-key",
                CredentialKind::Mnemonic => "mnemonic",
            },
            reason,
        })?;

    let chain_id = parse_number::<u64>(
        name,
        "chain_id",
        first_present(name, "chain_id", &spec.chain_id, inputs),
    )?;
    let chain_id = match (chain_id, spec.local) {
        (Some(chain_id), _) => chain_id,
        (None, true) => LOCAL_CHAIN_ID,
        (None, false) => {
            return Err(ConfigError::InvalidValue {
                network: name.to_string(),
                field: "chain_id",
                value: String::new(),
            });
        }
    };

    let gas_limit = parse_number::<u64>(
        name,
        "gas_limit",
        first_present(name, "gas_limit", &spec.gas_limit, inputs),
    )?;
    let gas_price = parse_number::<u128>(
        name,
        "gas_price",
        first_present(name, "gas_price", &spec.gas_price, inputs),
    )?;
    let confirmations_required = parse_number::<u64>(
        name,
        "confirmations",
        first_present(name, "confirmations", &spec.confirmations, inputs),
    )?
    .unwrap_or(DEFAULT_CONFIRMATIONS);

    Ok(NetworkProfile {
        name: name.to_string(),
        rpc_endpoint,
        chain_id,
        accounts: vec![credential],
        gas_limit,
        gas_price,
        confirmations_required,
        persist_records: spec.persist_records,
        allow_unlimited_size: spec.allow_unlimited_size,
        local: spec.local,
    })
}
