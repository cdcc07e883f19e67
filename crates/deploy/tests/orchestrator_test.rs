//! Integration tests for the deployment orchestrator.
//!
//! The chain is replaced by an in-memory client that mines every submitted
//! transaction at once and adds one confirmation per status query.
//! Run with: cargo test --test orchestrator_test

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use alloy_core::primitives::{Address, B256, Bytes};
use chainship_deploy::{
    Artifact, ArtifactError, ArtifactSource, ChainClient, ChainError, DeploymentError,
    DeploymentOrchestrator, DeploymentPlan, DeploymentRequest, DeploymentStatus, FsArtifacts,
    FsRecordStore, NetworkProfile, NetworkTable, OrchestratorOptions, RecordStore, ReportSink,
    SubmittedDeployment, TransactionStatus, resolve,
};
use tempdir::TempDir;

const PLAN: &str = "BitHo,BitTo,Fluna,Scoin";

/// How the fake chain treats a given contract.
#[derive(Debug, Clone)]
enum Behaviour {
    /// The node rejects the transaction at submission.
    RejectSubmission(String),
    /// The transaction is mined but the constructor reverts.
    RevertOnChain(String),
    /// The transaction never gets mined.
    NeverMined,
    /// Status queries fail.
    StatusError,
}

#[derive(Default)]
struct FakeState {
    submitted: Vec<String>,
    status_calls: usize,
    /// Status queries seen per transaction.
    polls: HashMap<B256, u64>,
}

#[derive(Default)]
struct FakeChain {
    behaviours: HashMap<String, Behaviour>,
    state: Mutex<FakeState>,
}

impl FakeChain {
    fn with(mut self, contract: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(contract.to_string(), behaviour);
        self
    }

    fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    /// Address given to the `index`-th deployment (1-based).
    fn address(index: usize) -> Address {
        Address::with_last_byte(index as u8)
    }

    fn tx_hash(index: usize) -> B256 {
        B256::with_last_byte(index as u8)
    }

    fn behaviour_for(&self, tx_hash: B256) -> Option<Behaviour> {
        let state = self.state.lock().unwrap();
        let index = tx_hash.0[31] as usize;
        state
            .submitted
            .get(index - 1)
            .and_then(|name| self.behaviours.get(name))
            .cloned()
    }
}

impl ChainClient for FakeChain {
    async fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmittedDeployment, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(request.contract_name.clone());

        if let Some(Behaviour::RejectSubmission(reason)) =
            self.behaviours.get(&request.contract_name)
        {
            return Err(ChainError::Reverted {
                reason: reason.clone(),
            });
        }

        let index = state.submitted.len();
        Ok(SubmittedDeployment {
            tx_hash: Self::tx_hash(index),
            contract_address: Self::address(index),
        })
    }

    async fn transaction_status(&self, tx_hash: B256) -> Result<TransactionStatus, ChainError> {
        let behaviour = self.behaviour_for(tx_hash);

        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        let polls = state.polls.entry(tx_hash).or_default();
        *polls += 1;

        match behaviour {
            Some(Behaviour::RevertOnChain(reason)) => Ok(TransactionStatus::Reverted { reason }),
            Some(Behaviour::NeverMined) => Ok(TransactionStatus::Pending),
            Some(Behaviour::StatusError) => Err(ChainError::Transport {
                method: "eth_getTransactionReceipt".to_string(),
                message: "connection refused".to_string(),
            }),
            _ => Ok(TransactionStatus::Mined {
                confirmations: *polls,
                contract_address: Some(Self::address(tx_hash.0[31] as usize)),
            }),
        }
    }
}

/// Artifacts held in memory, with a given runtime size.
#[derive(Default)]
struct FakeArtifacts {
    artifacts: HashMap<String, Artifact>,
}

impl FakeArtifacts {
    fn for_plan(plan: &str) -> Self {
        let mut this = Self::default();
        for name in plan.split(',') {
            this = this.with(name, 64);
        }
        this
    }

    fn with(mut self, name: &str, runtime_size: usize) -> Self {
        self.artifacts.insert(
            name.to_string(),
            Artifact {
                contract_name: name.to_string(),
                bytecode: Bytes::from(vec![0x60; 32]),
                deployed_bytecode: Bytes::from(vec![0x60; runtime_size]),
            },
        );
        self
    }

    fn without(mut self, name: &str) -> Self {
        self.artifacts.remove(name);
        self
    }
}

impl ArtifactSource for FakeArtifacts {
    fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError> {
        self.artifacts
            .get(contract_name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                contract: contract_name.to_string(),
                root: PathBuf::from("artifacts"),
            })
    }
}

fn local_profile(confirmations: u64) -> NetworkProfile {
    let inputs = BTreeMap::<String, String>::new();
    let mut profile = resolve("hardhat", &NetworkTable::builtin(), &inputs).unwrap();
    profile.confirmations_required = confirmations;
    profile
}

fn fast_options() -> OrchestratorOptions {
    OrchestratorOptions {
        poll_interval: Duration::from_millis(1),
        confirmation_timeout: Duration::from_secs(5),
    }
}

fn plan() -> DeploymentPlan {
    PLAN.parse().unwrap()
}

#[tokio::test]
async fn test_all_contracts_deployed_in_order() {
    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(report.succeeded());
    assert_eq!(report.exit_status(), 0);
    assert_eq!(chain.submitted(), vec!["BitHo", "BitTo", "Fluna", "Scoin"]);

    let names: Vec<&str> = report
        .records()
        .iter()
        .map(|r| r.contract_name.as_str())
        .collect();
    assert_eq!(names, vec!["BitHo", "BitTo", "Fluna", "Scoin"]);

    let mut sink = ReportSink::new(Vec::new());
    sink.emit(&report).unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 5);
    for (i, name) in ["BitHo", "BitTo", "Fluna", "Scoin"].iter().enumerate() {
        assert_eq!(
            lines[i],
            format!("{} deployed to: {}", name, FakeChain::address(i + 1))
        );
    }
    assert_eq!(
        lines[4],
        "Deployment succeeded: 4/4 contract(s) deployed to hardhat"
    );
}

#[tokio::test]
async fn test_revert_stops_the_plan() {
    let profile = local_profile(1);
    let chain =
        FakeChain::default().with("Fluna", Behaviour::RejectSubmission("paused".to_string()));
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.exit_status(), 1);
    assert_eq!(chain.submitted(), vec!["BitHo", "BitTo", "Fluna"]);

    let records = report.records();
    assert_eq!(records.len(), 3);
    assert!(records[0].is_success());
    assert!(records[1].is_success());
    assert_eq!(records[2].status, DeploymentStatus::Failed);
    assert_eq!(
        records[2].error,
        Some(DeploymentError::Submission(ChainError::Reverted {
            reason: "paused".to_string()
        }))
    );
    assert!(report.to_string().contains("Fluna failed: "));
    assert!(!report.to_string().contains("Scoin"));
}

#[tokio::test]
async fn test_failure_at_every_position() {
    let contracts = ["BitHo", "BitTo", "Fluna", "Scoin"];
    let profile = local_profile(1);
    let artifacts = FakeArtifacts::for_plan(PLAN);

    for (k, failing) in contracts.iter().enumerate() {
        let chain = FakeChain::default()
            .with(failing, Behaviour::RevertOnChain("constructor reverted".to_string()));

        let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
            .options(fast_options())
            .run(&plan())
            .await;

        assert!(!report.succeeded(), "failure at {}", failing);
        assert_eq!(report.records().len(), k + 1);
        assert!(report.records()[..k].iter().all(|r| r.is_success()));

        let failed = &report.records()[k];
        assert_eq!(failed.contract_name, *failing);
        assert!(matches!(
            failed.error,
            Some(DeploymentError::Reverted { ref reason, .. }) if reason == "constructor reverted"
        ));
        // The failed transaction was submitted, so its hash is kept.
        assert_eq!(failed.transaction_hash, Some(FakeChain::tx_hash(k + 1)));

        assert_eq!(chain.submitted(), contracts[..=k].to_vec());
    }
}

#[tokio::test]
async fn test_zero_confirmations_skip_status_queries() {
    let profile = local_profile(0);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(report.succeeded());
    assert_eq!(chain.status_calls(), 0);
    assert_eq!(report.records()[3].address, Some(FakeChain::address(4)));
}

#[tokio::test]
async fn test_polls_until_enough_confirmations() {
    let profile = local_profile(3);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan("BitHo");

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&DeploymentPlan::new(["BitHo"]))
        .await;

    assert!(report.succeeded());
    assert_eq!(chain.status_calls(), 3);
}

#[tokio::test]
async fn test_confirmation_timeout() {
    let profile = local_profile(1);
    let chain = FakeChain::default().with("BitTo", Behaviour::NeverMined);
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(OrchestratorOptions {
            poll_interval: Duration::from_millis(5),
            confirmation_timeout: Duration::from_millis(50),
        })
        .run(&plan())
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.records().len(), 2);
    assert!(matches!(
        report.records()[1].error,
        Some(DeploymentError::ConfirmationTimeout {
            required: 1,
            observed: 0,
            ..
        })
    ));
    assert_eq!(chain.submitted(), vec!["BitHo", "BitTo"]);
}

#[tokio::test]
async fn test_status_query_failure() {
    let profile = local_profile(1);
    let chain = FakeChain::default().with("BitHo", Behaviour::StatusError);
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert_eq!(report.records().len(), 1);
    let error = report.records()[0].error.as_ref().unwrap();
    assert!(matches!(error, DeploymentError::Confirmation { .. }));
    // The underlying transport error is surfaced.
    assert!(error.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_missing_artifact_aborts() {
    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN).without("Fluna");

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.exit_status(), 1);
    assert_eq!(report.records().len(), 2);
    assert!(report.records().iter().all(|r| r.is_success()));
    assert!(matches!(
        report.aborted(),
        Some(("Fluna", ArtifactError::NotFound { .. }))
    ));
    assert_eq!(chain.submitted(), vec!["BitHo", "BitTo"]);
}

#[tokio::test]
async fn test_oversized_contract_fails_before_submission() {
    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN).with("BitTo", 24_577);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert_eq!(report.records().len(), 2);
    assert_eq!(
        report.records()[1].error,
        Some(DeploymentError::ContractTooLarge {
            size: 24_577,
            limit: 24_576
        })
    );
    assert_eq!(chain.submitted(), vec!["BitHo"]);
}

#[tokio::test]
async fn test_unlimited_size_allows_large_contracts() {
    let mut profile = local_profile(1);
    profile.allow_unlimited_size = true;
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN).with("BitTo", 30_000);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(report.succeeded());
}

#[tokio::test]
async fn test_empty_plan() {
    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::default();

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .run(&DeploymentPlan::default())
        .await;

    assert!(report.succeeded());
    assert!(report.records().is_empty());
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_records_persisted_when_enabled() {
    let dir = TempDir::new("deployments").unwrap();
    let store = FsRecordStore::new(dir.path());

    let mut profile = local_profile(1);
    profile.persist_records = true;
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .store(&store)
        .options(fast_options())
        .run(&plan())
        .await;
    assert!(report.succeeded());

    let stored = store.load("hardhat", "Fluna").unwrap().unwrap();
    assert_eq!(stored.address, FakeChain::address(3));
    assert_eq!(stored.transaction_hash, FakeChain::tx_hash(3));
    assert_eq!(stored.chain_id, 31337);
    assert_eq!(stored.bytecode_hash.len(), 64);
}

#[tokio::test]
async fn test_records_not_persisted_when_disabled() {
    let dir = TempDir::new("deployments").unwrap();
    let store = FsRecordStore::new(dir.path());

    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .store(&store)
        .options(fast_options())
        .run(&plan())
        .await;

    assert!(report.succeeded());
    assert!(!dir.path().join("hardhat").exists());
}

#[tokio::test]
async fn test_persist_failure_keeps_address() {
    let dir = TempDir::new("deployments").unwrap();
    // A file where the network directory should be makes every save fail.
    std::fs::write(dir.path().join("hardhat"), "").unwrap();
    let store = FsRecordStore::new(dir.path());

    let mut profile = local_profile(1);
    profile.persist_records = true;
    let chain = FakeChain::default();
    let artifacts = FakeArtifacts::for_plan(PLAN);

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .store(&store)
        .options(fast_options())
        .run(&plan())
        .await;

    assert_eq!(report.records().len(), 1);
    let record = &report.records()[0];
    assert!(matches!(record.error, Some(DeploymentError::Persist(_))));
    assert_eq!(record.address, Some(FakeChain::address(1)));
    assert_eq!(record.transaction_hash, Some(FakeChain::tx_hash(1)));
    assert_eq!(chain.submitted(), vec!["BitHo"]);
}

#[tokio::test]
async fn test_hardhat_artifacts_from_disk() {
    let dir = TempDir::new("artifacts").unwrap();
    for name in ["BitHo", "BitTo"] {
        let contract_dir = dir.path().join(format!("contracts/{}.sol", name));
        std::fs::create_dir_all(&contract_dir).unwrap();
        std::fs::write(
            contract_dir.join(format!("{}.json", name)),
            serde_json::json!({
                "contractName": name,
                "bytecode": "0x6080604052348015600f57600080fd5b50",
                "deployedBytecode": "0x6080604052"
            })
            .to_string(),
        )
        .unwrap();
    }

    let profile = local_profile(1);
    let chain = FakeChain::default();
    let artifacts = FsArtifacts::new(dir.path());

    let report = DeploymentOrchestrator::new(&profile, &chain, &artifacts)
        .options(fast_options())
        .run(&DeploymentPlan::new(["BitHo", "BitTo"]))
        .await;

    assert!(report.succeeded());
    assert_eq!(report.deployed_count(), 2);
}
