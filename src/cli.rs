use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Declarative, idempotent system-state reconciliation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile the system against a playbook
    Run(RunArgs),

    /// Load and validate a playbook without executing anything
    Validate(ValidateArgs),

    /// Show the facts a run would see
    Facts(FactsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the playbook document
    pub playbook: PathBuf,

    /// Task list to start from
    #[arg(short, long, default_value = "main")]
    pub entry: String,

    /// Extra facts file, overriding gathered facts
    #[arg(short, long)]
    pub facts: Option<PathBuf>,

    /// Detect state but make no changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Package manager command to drive
    #[arg(long, env = "CONVERGE_PKG_CMD", default_value = "dnf")]
    pub pkg_cmd: String,

    /// Allow group removal to cascade into member packages
    #[arg(long)]
    pub allow_group_cascade: bool,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to the playbook document
    pub playbook: PathBuf,

    /// Task list to start from
    #[arg(short, long, default_value = "main")]
    pub entry: String,
}

#[derive(Parser)]
pub struct FactsArgs {
    /// Extra facts file, overriding gathered facts
    #[arg(short, long)]
    pub facts: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored per-node lines plus a summary
    Text,
    /// The full run report as JSON
    Json,
}
