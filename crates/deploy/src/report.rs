//! Deployment outcomes and their rendering.

use std::{fmt, io, process::ExitCode};

use alloy_core::primitives::{Address, B256};

use crate::{ArtifactError, DeploymentError};

/// Outcome of one plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DeploymentStatus {
    Success,
    Failed,
}

/// The outcome of deploying one contract. Never modified once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Option<Address>,
    pub transaction_hash: Option<B256>,
    pub status: DeploymentStatus,
    pub error: Option<DeploymentError>,
}

impl DeploymentRecord {
    pub fn success(contract_name: impl Into<String>, address: Address, tx_hash: B256) -> Self {
        Self {
            contract_name: contract_name.into(),
            address: Some(address),
            transaction_hash: Some(tx_hash),
            status: DeploymentStatus::Success,
            error: None,
        }
    }

    /// A failed entry. `address` and `tx_hash` are kept when already known.
    pub fn failure(
        contract_name: impl Into<String>,
        address: Option<Address>,
        tx_hash: Option<B256>,
        error: DeploymentError,
    ) -> Self {
        Self {
            contract_name: contract_name.into(),
            address,
            transaction_hash: tx_hash,
            status: DeploymentStatus::Failed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }
}

impl fmt::Display for DeploymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.address, &self.error) {
            (DeploymentStatus::Success, Some(address), _) => {
                write!(f, "{} deployed to: {}", self.contract_name, address)
            }
            (_, _, Some(error)) => write!(f, "{} failed: {}", self.contract_name, error),
            _ => write!(f, "{} failed", self.contract_name),
        }
    }
}

/// Records of the contracts actually attempted, in plan order.
///
/// The records always form a prefix of the plan: the run stops at the first
/// failed entry, or before an entry whose artifact could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    network: String,
    planned: usize,
    records: Vec<DeploymentRecord>,
    abort: Option<(String, ArtifactError)>,
    succeeded: bool,
}

impl DeploymentReport {
    pub(crate) fn new(network: impl Into<String>, planned: usize) -> Self {
        Self {
            network: network.into(),
            planned,
            records: Vec::with_capacity(planned),
            abort: None,
            succeeded: false,
        }
    }

    pub(crate) fn push(&mut self, record: DeploymentRecord) {
        self.records.push(record);
    }

    pub(crate) fn abort(&mut self, contract_name: impl Into<String>, error: ArtifactError) {
        self.abort = Some((contract_name.into(), error));
    }

    pub(crate) fn finalize(mut self) -> Self {
        self.succeeded = self.abort.is_none()
            && self.records.len() == self.planned
            && self.records.iter().all(DeploymentRecord::is_success);
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Number of contracts in the plan.
    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }

    /// The artifact error that aborted the run, with the contract it concerned.
    pub fn aborted(&self) -> Option<(&str, &ArtifactError)> {
        self.abort.as_ref().map(|(name, err)| (name.as_str(), err))
    }

    /// Whether every planned contract was deployed.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn deployed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    /// Process exit status: 0 on full success, 1 otherwise.
    pub fn exit_status(&self) -> u8 {
        if self.succeeded { 0 } else { 1 }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }

        if let Some((contract_name, error)) = &self.abort {
            writeln!(f, "Aborted at {}: {}", contract_name, error)?;
        }

        let status = if self.succeeded { "succeeded" } else { "failed" };
        write!(
            f,
            "Deployment {}: {}/{} contract(s) deployed to {}",
            status,
            self.deployed_count(),
            self.planned,
            self.network
        )
    }
}

/// Writes reports to an output stream and maps them to an exit code.
pub struct ReportSink<W> {
    out: W,
}

impl<W: io::Write> ReportSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write the report, one line per record plus a status line.
    pub fn emit(&mut self, report: &DeploymentReport) -> io::Result<ExitCode> {
        writeln!(self.out, "{}", report)?;
        self.out.flush()?;
        Ok(report.exit_code())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
