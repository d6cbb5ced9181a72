//! Clap derive structures for the `hadash` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hadash -- companion host for a wearable Home Assistant dashboard
#[derive(Debug, Parser)]
#[command(
    name = "hadash",
    version,
    about = "Serve a wearable Home Assistant dashboard",
    long_about = "Companion host for a wearable Home Assistant dashboard.\n\n\
        Talks to the Home Assistant REST API through a local address first\n\
        and a remote address second, and serves the watch over stdio.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HADASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// LAN address of Home Assistant (overrides config)
    #[arg(long, short = 'l', env = "HADASH_LOCAL_URL", global = true)]
    pub local_url: Option<String>,

    /// Remote address of Home Assistant (overrides config)
    #[arg(long, short = 'e', env = "HADASH_EXTERNAL_URL", global = true)]
    pub external_url: Option<String>,

    /// Long-lived access token
    #[arg(long, env = "HADASH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HADASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "HADASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt timeout in seconds (overrides config)
    #[arg(long, env = "HADASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the watch over stdin/stdout as line-delimited JSON
    Serve,

    /// Show the selected sensors with their current state
    #[command(alias = "ls")]
    Sensors(SensorsArgs),

    /// List every entity Home Assistant reports
    Catalog,

    /// Turn an entity on or off
    Toggle(ToggleArgs),

    /// Check that Home Assistant answers, and through which address
    Check,

    /// Inspect or write the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    /// Entity ids to show (defaults to the configured selection)
    pub entities: Vec<String>,
}

// ── Toggle ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("state").required(true).args(["on", "off"])))]
pub struct ToggleArgs {
    /// Target entity id (e.g. switch.fan)
    pub entity_id: String,

    /// Turn the entity on
    #[arg(long)]
    pub on: bool,

    /// Turn the entity off
    #[arg(long)]
    pub off: bool,

    /// Service domain (defaults to "switch")
    #[arg(long, short = 's')]
    pub service: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (token redacted)
    Show,

    /// Write the effective configuration, including flag overrides, to the config file
    Save(ConfigSaveArgs),
}

#[derive(Debug, Args)]
pub struct ConfigSaveArgs {
    /// Name of an environment variable to read the token from
    #[arg(long)]
    pub token_env: Option<String>,

    /// Entity ids to select at startup
    #[arg(long, value_delimiter = ',')]
    pub sensors: Vec<String>,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
