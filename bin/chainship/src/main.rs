//! chainship deploys compiled contracts to a configured network, one after the other.

mod cli;

use std::{io, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use chainship_deploy::{
    ArtifactSource, DeploymentOrchestrator, FsArtifacts, FsRecordStore, MAX_INIT_SIZE,
    MAX_RUNTIME_SIZE, NetworkTable, OrchestratorOptions, ProcessEnv, ReportSink, RpcChainClient, resolve,
};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command, DeployArgs, SizesArgs};

#[tokio::main]
async fn main() -> ExitCode {
    // Variables from .env are visible to both the CLI and the network resolution.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let table = NetworkTable::load(cli.config.as_deref())?;

    match cli.command {
        Command::Deploy(args) => deploy(&table, args).await,
        Command::Sizes(args) => {
            sizes(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Networks => {
            networks(&table);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn deploy(table: &NetworkTable, args: DeployArgs) -> Result<ExitCode> {
    let network = args
        .network
        .unwrap_or_else(|| table.default_network.clone());

    let profile = resolve(&network, table, &ProcessEnv)
        .context(format!("Failed to resolve network '{}'", network))?;

    tracing::info!(
        network = %profile.name,
        endpoint = %profile.rpc_endpoint,
        chain_id = profile.chain_id,
        confirmations = profile.confirmations_required,
        "Network resolved"
    );

    let client = RpcChainClient::connect(&profile)
        .await
        .context(format!("Failed to connect to network '{}'", network))?;

    let artifacts = FsArtifacts::new(args.artifacts);
    let store = FsRecordStore::new(args.deployments_dir);

    let report = DeploymentOrchestrator::new(&profile, &client, &artifacts)
        .store(&store)
        .options(OrchestratorOptions {
            poll_interval: Duration::from_millis(args.poll_interval),
            confirmation_timeout: Duration::from_secs(args.confirmation_timeout),
        })
        .run(&args.contracts)
        .await;

    ReportSink::new(io::stdout().lock())
        .emit(&report)
        .context("Failed to write deployment report")
}

fn sizes(args: &SizesArgs) -> Result<()> {
    let artifacts = FsArtifacts::new(&args.artifacts);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Contract", "Init size (KiB)", "Runtime size (KiB)", "Deployable"]);

    for contract_name in args.contracts.iter() {
        let artifact = artifacts
            .load(contract_name)
            .context(format!("Failed to load artifact for {}", contract_name))?;

        table.add_row(vec![
            contract_name.clone(),
            format_kib(artifact.init_size()),
            format_kib(artifact.runtime_size()),
            deployable(artifact.init_size(), artifact.runtime_size()),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn networks(table: &NetworkTable) {
    let mut output = Table::new();
    output.load_preset(UTF8_FULL);
    output.set_header(vec!["Network", "Kind", "Persist records", "Unlimited size"]);

    for (name, spec) in &table.networks {
        let name = if *name == table.default_network {
            format!("{} (default)", name)
        } else {
            name.clone()
        };

        output.add_row(vec![
            name,
            if spec.local { "local" } else { "remote" }.to_string(),
            spec.persist_records.to_string(),
            spec.allow_unlimited_size.to_string(),
        ]);
    }

    println!("{}", output);
}

/// Whether bytecode of these sizes fits the EIP-170 and EIP-3860 limits.
fn deployable(init_size: usize, runtime_size: usize) -> String {
    if runtime_size > MAX_RUNTIME_SIZE {
        "no, runtime above the 24 KiB limit".to_string()
    } else if init_size > MAX_INIT_SIZE {
        "no, init code above the 48 KiB limit".to_string()
    } else {
        "yes".to_string()
    }
}

fn format_kib(size: usize) -> String {
    format!("{:.3}", size as f64 / 1024.0)
}
