use std::path::PathBuf;

use chainship_deploy::{DEFAULT_PLAN, DeploymentPlan};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Default directory holding compiled contract artifacts (Hardhat layout).
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Default directory where deployment records are written.
const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

#[derive(Parser)]
#[command(name = "chainship")]
#[command(
    author,
    version,
    about = "Deploy compiled contracts to a configured network, in order"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CHAINSHIP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Chainship.toml file (or a directory containing one) extending the
    /// built-in network table.
    ///
    /// If not provided, ./Chainship.toml is used when it exists.
    #[arg(long, alias = "conf", env = "CHAINSHIP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy the contracts of the plan, one after the other, stopping at the first failure.
    Deploy(DeployArgs),

    /// Print the init and runtime bytecode size of each planned contract.
    Sizes(SizesArgs),

    /// List the known networks.
    Networks,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// The network to deploy to.
    ///
    /// If not provided, the network table's default network is used.
    #[arg(short, long, env = "CHAINSHIP_NETWORK")]
    pub network: Option<String>,

    /// Comma-separated list of contracts to deploy, in order.
    #[arg(short, long, env = "CHAINSHIP_CONTRACTS", default_value = DEFAULT_PLAN)]
    pub contracts: DeploymentPlan,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "CHAINSHIP_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Directory where deployment records are written, for networks that persist them.
    #[arg(long, env = "CHAINSHIP_DEPLOYMENTS_DIR", default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments_dir: PathBuf,

    /// Maximum time, in seconds, to wait for the confirmations of one deployment.
    #[arg(long, env = "CHAINSHIP_CONFIRMATION_TIMEOUT", default_value_t = 200)]
    pub confirmation_timeout: u64,

    /// Delay, in milliseconds, between two transaction status queries.
    #[arg(long, env = "CHAINSHIP_POLL_INTERVAL", default_value_t = 2000)]
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Args)]
pub struct SizesArgs {
    /// Comma-separated list of contracts to measure.
    #[arg(short, long, env = "CHAINSHIP_CONTRACTS", default_value = DEFAULT_PLAN)]
    pub contracts: DeploymentPlan,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "CHAINSHIP_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,
}
