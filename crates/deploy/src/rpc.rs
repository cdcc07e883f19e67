//! JSON-RPC chain client.
//!
//! Deployments are signed locally with the network's first account and sent
//! with `eth_sendRawTransaction`, so hosted endpoints that do not manage
//! accounts work as well as local development nodes.

use std::time::Duration;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_signer_local::PrivateKeySigner;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{
    ChainError, NetworkProfile,
    account::deployer_signer,
    chain::{ChainClient, DeploymentRequest, SubmittedDeployment, TransactionStatus},
};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts for idempotent reads failing at the transport level.
const READ_RETRIES: usize = 3;

/// JSON-RPC error code used by Ethereum nodes for execution reverts.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, ChainError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| ChainError::Transport {
            method: "client".to_string(),
            message: e.to_string(),
        })
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result deserializes fine into an `Option<T>`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, ChainError> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|e| ChainError::Transport {
            method: method.to_string(),
            message: e.to_string(),
        })?;

    let result: Value = response.json().await.map_err(|e| ChainError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })?;

    if let Some(error) = result.get("error") {
        return Err(ChainError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result.get("result").cloned().ok_or_else(|| ChainError::Decode {
        method: method.to_string(),
        message: "no result in response".to_string(),
    })?;

    serde_json::from_value(result_value).map_err(|e| ChainError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// Parse a hex quantity (with 0x prefix) into a u64.
fn parse_quantity(method: &str, quantity: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(quantity.trim_start_matches("0x"), 16).map_err(|e| ChainError::Decode {
        method: method.to_string(),
        message: format!("invalid quantity '{}': {}", quantity, e),
    })
}

/// Parse a hex amount of wei (with 0x prefix).
fn parse_wei(method: &str, quantity: &str) -> Result<u128, ChainError> {
    u128::from_str_radix(quantity.trim_start_matches("0x"), 16).map_err(|e| ChainError::Decode {
        method: method.to_string(),
        message: format!("invalid quantity '{}': {}", quantity, e),
    })
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// The subset of a transaction receipt needed to track a deployment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    /// `0x1` on success, `0x0` on failure. Absent on pre-Byzantium chains.
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
}

/// Maps node-side execution failures to [`ChainError::Reverted`].
fn classify_submission_error(err: ChainError) -> ChainError {
    match err {
        ChainError::Rpc { code, message, .. }
            if code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert") =>
        {
            ChainError::Reverted { reason: message }
        }
        other => other,
    }
}

/// [`ChainClient`] speaking Ethereum JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    client: reqwest::Client,
    endpoint: Url,
    chain_id: u64,
    signer: PrivateKeySigner,
}

impl RpcChainClient {
    /// Connect to the profile's endpoint.
    ///
    /// The deployer is the first configured account. The node's chain id must
    /// match the profile.
    pub async fn connect(profile: &NetworkProfile) -> Result<Self, ChainError> {
        let credential = profile.accounts.first().ok_or_else(|| {
            ChainError::Credential(format!("no account configured for network '{}'", profile.name))
        })?;

        let this = Self {
            client: create_client()?,
            endpoint: profile.rpc_endpoint.clone(),
            chain_id: profile.chain_id,
            signer: deployer_signer(credential)?,
        };

        let chain_id = this.remote_chain_id().await?;
        if chain_id != profile.chain_id {
            return Err(ChainError::ChainIdMismatch {
                expected: profile.chain_id,
                actual: chain_id,
            });
        }

        tracing::info!(
            network = %profile.name,
            endpoint = %this.endpoint,
            chain_id,
            deployer = %this.sender(),
            "Connected to network"
        );

        Ok(this)
    }

    /// The account deployments are sent from.
    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Chain id reported by the node.
    pub async fn remote_chain_id(&self) -> Result<u64, ChainError> {
        let quantity: String = self.read("eth_chainId", vec![]).await?;
        parse_quantity("eth_chainId", &quantity)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let quantity: String = self.read("eth_blockNumber", vec![]).await?;
        parse_quantity("eth_blockNumber", &quantity)
    }

    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        let quantity: String = self
            .read(
                "eth_getTransactionCount",
                vec![serde_json::json!(self.sender()), serde_json::json!("pending")],
            )
            .await?;
        parse_quantity("eth_getTransactionCount", &quantity)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let quantity: String = self.read("eth_gasPrice", vec![]).await?;
        parse_wei("eth_gasPrice", &quantity)
    }

    /// Gas needed to create the contract. A constructor revert surfaces here.
    async fn estimate_gas(&self, bytecode: &Bytes) -> Result<u64, ChainError> {
        let quantity: String = self
            .read(
                "eth_estimateGas",
                vec![serde_json::json!({ "from": self.sender(), "data": bytecode })],
            )
            .await?;
        parse_quantity("eth_estimateGas", &quantity)
    }

    /// Idempotent call, retried on transport failures.
    async fn read<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<T, ChainError> {
        let client = &self.client;
        let url = self.endpoint.as_str();

        (|| {
            let params = params.clone();
            async move { json_rpc_call(client, url, method, params).await }
        })
        .retry(ExponentialBuilder::default().with_max_times(READ_RETRIES))
        .when(|err| matches!(err, ChainError::Transport { .. }))
        .notify(|err, delay| {
            tracing::debug!(method, error = %err, ?delay, "RPC read failed, retrying...");
        })
        .await
    }

    /// Sign a legacy (EIP-155) contract creation transaction and encode it.
    fn sign_creation(&self, mut tx: TxLegacy) -> Result<Bytes, ChainError> {
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

impl ChainClient for RpcChainClient {
    async fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmittedDeployment, ChainError> {
        let nonce = self.pending_nonce().await?;
        let contract_address = self.sender().create(nonce);

        let gas_limit = match request.gas_limit {
            Some(gas_limit) => gas_limit,
            None => self
                .estimate_gas(&request.bytecode)
                .await
                .map_err(classify_submission_error)?,
        };
        let gas_price = match request.gas_price {
            Some(gas_price) => gas_price,
            None => self.gas_price().await?,
        };

        let raw = self.sign_creation(TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: request.bytecode.clone(),
        })?;

        tracing::debug!(
            contract = %request.contract_name,
            nonce,
            gas_limit,
            gas_price,
            predicted_address = %contract_address,
            "Sending deployment transaction"
        );

        let tx_hash: B256 = json_rpc_call(
            &self.client,
            self.endpoint.as_str(),
            "eth_sendRawTransaction",
            vec![serde_json::json!(raw)],
        )
        .await
        .map_err(classify_submission_error)?;

        Ok(SubmittedDeployment {
            tx_hash,
            contract_address,
        })
    }

    async fn transaction_status(&self, tx_hash: B256) -> Result<TransactionStatus, ChainError> {
        let receipt: Option<TransactionReceipt> = self
            .read("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await?;

        let Some(receipt) = receipt else {
            return Ok(TransactionStatus::Pending);
        };

        if let Some(status) = receipt.status.as_deref() {
            if parse_quantity("eth_getTransactionReceipt", status)? == 0 {
                return Ok(TransactionStatus::Reverted {
                    reason: format!("execution failed in block {}", receipt.block_number),
                });
            }
        }

        let head = self.block_number().await?;
        Ok(TransactionStatus::Mined {
            confirmations: head.saturating_sub(receipt.block_number) + 1,
            contract_address: receipt.contract_address,
        })
    }
}
