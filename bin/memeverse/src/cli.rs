use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memeverse_deploy::DEFAULT_CONFIG_FILE;
use tracing::level_filters::LevelFilter;

/// Output format of listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "memeverse")]
#[command(
    author,
    version,
    about = "Deterministic Memeverse deployments and cross-chain route wiring"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "MEMEVERSE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file, or to a directory containing Memeverse.toml.
    #[arg(short, long, global = true, alias = "conf", env = "MEMEVERSE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy, verify and configure the given tasks.
    Deploy {
        /// Tags of the tasks to run.
        #[arg(required_unless_present = "all")]
        tags: Vec<String>,

        /// Run every configured task.
        #[arg(long, conflicts_with = "tags")]
        all: bool,

        /// Deploy to different networks concurrently.
        ///
        /// Tasks targeting the same network always run in order.
        #[arg(long, env = "MEMEVERSE_PARALLEL")]
        parallel: bool,

        /// Skip source verification.
        #[arg(long, env = "MEMEVERSE_SKIP_VERIFY")]
        skip_verify: bool,

        /// Override the number of verification attempts.
        #[arg(long, env = "MEMEVERSE_MAX_VERIFY_ATTEMPTS")]
        max_verify_attempts: Option<u32>,
    },

    /// Print salts and CREATE2 addresses without touching any chain.
    ///
    /// Addresses use the factory as the CREATE2 deployer and ignore the
    /// sending account. The factory's `getDeployed` is authoritative.
    Predict {
        /// Tags of the tasks to predict.
        #[arg(required_unless_present = "all")]
        tags: Vec<String>,

        /// Predict every configured task.
        #[arg(long, conflicts_with = "tags")]
        all: bool,

        #[arg(long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List the configured tasks.
    Tasks {
        #[arg(long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Route table operations.
    Routes {
        #[command(subcommand)]
        command: RoutesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// Validate a route table and report every issue.
    Validate {
        /// Route table file; defaults to the one named in the configuration.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Export the route table as JSON for the messaging configuration tool.
    Export {
        /// Route table file; defaults to the one named in the configuration.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output file; stdout when absent.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
