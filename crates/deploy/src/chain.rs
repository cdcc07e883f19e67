//! Chain client seam used by the orchestrator.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};

use crate::ChainError;

/// A contract creation transaction to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub contract_name: String,
    /// Creation bytecode (constructor arguments already appended, if any).
    pub bytecode: Bytes,
    pub gas_limit: Option<u64>,
    /// Gas price in wei.
    pub gas_price: Option<u128>,
}

/// Acknowledgement of a submitted deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedDeployment {
    pub tx_hash: B256,
    /// Address the contract will live at once the transaction is mined.
    pub contract_address: Address,
}

/// Inclusion status of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Not mined yet.
    Pending,
    /// Mined, with `confirmations` blocks including and following the transaction.
    Mined {
        confirmations: u64,
        contract_address: Option<Address>,
    },
    /// Mined but execution failed (e.g. the constructor reverted).
    Reverted { reason: String },
}

/// Submits deployment transactions and reports on their inclusion.
///
/// Transaction construction and signing are entirely up to the implementation.
pub trait ChainClient: Send + Sync {
    /// Submit a contract creation transaction, returning once the node accepted it.
    fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> impl Future<Output = Result<SubmittedDeployment, ChainError>> + Send;

    /// Query the current inclusion status of a transaction.
    fn transaction_status(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<TransactionStatus, ChainError>> + Send;
}
