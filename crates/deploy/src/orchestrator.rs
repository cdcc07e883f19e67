//! Sequential, fail-fast deployment of a plan.

use std::time::Duration;

use alloy_core::primitives::{Address, B256};

use crate::{
    Artifact, ArtifactSource, DeploymentError, DeploymentPlan, MAX_RUNTIME_SIZE, NetworkProfile,
    chain::{ChainClient, DeploymentRequest, TransactionStatus},
    report::{DeploymentRecord, DeploymentReport},
    store::{RecordStore, StoredDeployment},
};

/// Default delay between two transaction status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default bound on the wait for confirmations of a single deployment.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(200);

/// Timing knobs of the confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Deploys the contracts of a plan one after the other on a single network.
///
/// Contract `i + 1` is only submitted once contract `i` is confirmed (and
/// persisted, when the network asks for it). The first failure stops the run.
pub struct DeploymentOrchestrator<'a, C, A> {
    profile: &'a NetworkProfile,
    client: &'a C,
    artifacts: &'a A,
    store: Option<&'a dyn RecordStore>,
    options: OrchestratorOptions,
}

impl<'a, C: ChainClient, A: ArtifactSource> DeploymentOrchestrator<'a, C, A> {
    pub fn new(profile: &'a NetworkProfile, client: &'a C, artifacts: &'a A) -> Self {
        Self {
            profile,
            client,
            artifacts,
            store: None,
            options: OrchestratorOptions::default(),
        }
    }

    /// Record store used when the network has `persist_records` set.
    pub fn store(mut self, store: &'a dyn RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the plan to completion or to its first failure.
    ///
    /// Never panics on a chain failure: errors end up in the report.
    pub async fn run(&self, plan: &DeploymentPlan) -> DeploymentReport {
        let network = self.profile.name.as_str();
        let mut report = DeploymentReport::new(network, plan.len());

        tracing::info!(
            network,
            plan = %plan,
            confirmations = self.profile.confirmations_required,
            "Starting deployment"
        );

        for contract_name in plan.iter() {
            let artifact = match self.artifacts.load(contract_name) {
                Ok(artifact) => artifact,
                Err(err) => {
                    tracing::error!(contract = %contract_name, error = %err, "Aborting deployment");
                    report.abort(contract_name.as_str(), err);
                    break;
                }
            };

            let record = self.deploy(&artifact).await;
            let success = record.is_success();
            report.push(record);

            if !success {
                break;
            }
        }

        let report = report.finalize();
        tracing::info!(
            network,
            deployed = report.deployed_count(),
            planned = report.planned(),
            succeeded = report.succeeded(),
            "Deployment finished"
        );
        report
    }

    /// Deploy a single contract, returning its final record.
    async fn deploy(&self, artifact: &Artifact) -> DeploymentRecord {
        let name = artifact.contract_name.as_str();

        if !self.profile.allow_unlimited_size && artifact.runtime_size() > MAX_RUNTIME_SIZE {
            let err = DeploymentError::ContractTooLarge {
                size: artifact.runtime_size(),
                limit: MAX_RUNTIME_SIZE,
            };
            tracing::error!(contract = name, error = %err, "Contract too large");
            return DeploymentRecord::failure(name, None, None, err);
        }

        self.check_existing(name);

        let request = DeploymentRequest {
            contract_name: name.to_string(),
            bytecode: artifact.bytecode.clone(),
            gas_limit: self.profile.gas_limit,
            gas_price: self.profile.gas_price,
        };

        tracing::info!(contract = name, "Deploying contract...");
        let submitted = match self.client.submit_deployment(&request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                let err = DeploymentError::Submission(err);
                tracing::error!(contract = name, error = %err, "Deployment failed");
                return DeploymentRecord::failure(name, None, None, err);
            }
        };

        let tx_hash = submitted.tx_hash;
        tracing::debug!(contract = name, %tx_hash, "Deployment transaction submitted");

        let address = if self.profile.confirmations_required == 0 {
            submitted.contract_address
        } else {
            match self.wait_for_confirmations(tx_hash).await {
                Ok(address) => address,
                Err(err) => {
                    tracing::error!(contract = name, %tx_hash, error = %err, "Deployment failed");
                    return DeploymentRecord::failure(
                        name,
                        Some(submitted.contract_address),
                        Some(tx_hash),
                        err,
                    );
                }
            }
        };

        if let Err(err) = self.persist(artifact, address, tx_hash) {
            tracing::error!(contract = name, %address, error = %err, "Deployment not persisted");
            return DeploymentRecord::failure(name, Some(address), Some(tx_hash), err);
        }

        tracing::info!(contract = name, %address, %tx_hash, "Contract deployed");
        DeploymentRecord::success(name, address, tx_hash)
    }

    /// Poll the transaction until it has enough confirmations.
    async fn wait_for_confirmations(&self, tx_hash: B256) -> Result<Address, DeploymentError> {
        let required = self.profile.confirmations_required;
        let mut observed = 0;

        let wait = async {
            loop {
                match self.client.transaction_status(tx_hash).await {
                    Ok(TransactionStatus::Reverted { reason }) => {
                        return Err(DeploymentError::Reverted { tx_hash, reason });
                    }
                    Ok(TransactionStatus::Mined {
                        confirmations,
                        contract_address,
                    }) => {
                        observed = confirmations;
                        if confirmations >= required {
                            return contract_address
                                .ok_or(DeploymentError::MissingContractAddress { tx_hash });
                        }
                        tracing::debug!(%tx_hash, confirmations, required, "Waiting for confirmations...");
                    }
                    Ok(TransactionStatus::Pending) => {
                        tracing::debug!(%tx_hash, "Transaction pending...");
                    }
                    Err(source) => {
                        return Err(DeploymentError::Confirmation { tx_hash, source });
                    }
                }

                tokio::time::sleep(self.options.poll_interval).await;
            }
        };

        let outcome = tokio::time::timeout(self.options.confirmation_timeout, wait).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(DeploymentError::ConfirmationTimeout {
                tx_hash,
                required,
                observed,
                timeout_secs: self.options.confirmation_timeout.as_secs(),
            }),
        }
    }

    /// Log a record left by an earlier run for the same contract and network.
    fn check_existing(&self, contract_name: &str) {
        let Some(store) = self.persisting_store() else {
            return;
        };

        match store.load(&self.profile.name, contract_name) {
            Ok(Some(existing)) => tracing::info!(
                contract = contract_name,
                address = %existing.address,
                deployed_at = existing.deployed_at,
                "Found existing deployment record, deploying a new instance"
            ),
            Ok(None) => {}
            Err(err) => tracing::warn!(
                contract = contract_name,
                error = %err,
                "Failed to read existing deployment record"
            ),
        }
    }

    fn persist(
        &self,
        artifact: &Artifact,
        address: Address,
        tx_hash: B256,
    ) -> Result<(), DeploymentError> {
        let Some(store) = self.persisting_store() else {
            return Ok(());
        };

        let record = StoredDeployment::new(
            artifact.contract_name.as_str(),
            address,
            tx_hash,
            self.profile.chain_id,
            artifact.bytecode_hash(),
        );
        store
            .save(&self.profile.name, &record)
            .map_err(|e| DeploymentError::Persist(format!("{:#}", e)))
    }

    fn persisting_store(&self) -> Option<&'a dyn RecordStore> {
        if self.profile.persist_records {
            self.store
        } else {
            None
        }
    }
}
