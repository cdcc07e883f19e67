//! chainship-deploy - Contract deployment library.
//!
//! This crate resolves a named network into a [`NetworkProfile`] and deploys
//! an ordered [`DeploymentPlan`] of compiled contracts to it, one contract at
//! a time, stopping at the first failure.

mod account;
pub use account::{deployer_address, deployer_signer};

mod artifact;
pub use artifact::{Artifact, ArtifactSource, FsArtifacts, MAX_INIT_SIZE, MAX_RUNTIME_SIZE};

mod chain;
pub use chain::{ChainClient, DeploymentRequest, SubmittedDeployment, TransactionStatus};

pub mod config;
pub use config::{
    ConfigInputs, Credential, CredentialKind, CredentialSource, NetworkProfile, NetworkSpec,
    NetworkTable, ProcessEnv, Source, resolve,
};

mod error;
pub use error::{ArtifactError, ChainError, ConfigError, DeploymentError};

mod orchestrator;
pub use orchestrator::{
    DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL, DeploymentOrchestrator,
    OrchestratorOptions,
};

mod plan;
pub use plan::DeploymentPlan;

mod report;
pub use report::{DeploymentRecord, DeploymentReport, DeploymentStatus, ReportSink};

pub mod rpc;
pub use rpc::RpcChainClient;

mod store;
pub use store::{FsRecordStore, RecordStore, StoredDeployment};

/// Contracts deployed when no plan is given.
pub const DEFAULT_PLAN: &str = "BitHo,BitTo,Fluna,Scoin";
