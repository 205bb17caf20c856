//! Clap derive structures for the `encfleet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// encfleet -- discover, template and provision network video encoders
#[derive(Debug, Parser)]
#[command(
    name = "encfleet",
    version,
    about = "Manage a fleet of network video encoders from the command line",
    long_about = "Discover encoders on a subnet, elect one device's settings as the\n\
        control template, and push merged settings to many devices at once.\n\n\
        Device identity (recording channel folders and prefixes) is never\n\
        overwritten by a push.",
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
    /// Config file to use instead of the platform default
    #[arg(long, env = "ENCFLEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Local host address used to derive the default subnet
    #[arg(long, env = "ENCFLEET_HOST_ADDRESS", global = true)]
    pub host_address: Option<String>,

    /// HTTP port of the device API
    #[arg(long, env = "ENCFLEET_DEVICE_PORT", global = true)]
    pub port: Option<u16>,

    /// Device login name
    #[arg(long, short = 'u', env = "ENCFLEET_USERNAME", global = true)]
    pub username: Option<String>,

    /// Device password (prefer the keyring: `encfleet config set-password`)
    #[arg(long, env = "ENCFLEET_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format [default: table, or `defaults.output` from the config]
    #[arg(long, short = 'o', env = "ENCFLEET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: auto, or `defaults.color` from the config]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    /// Output format in effect once config defaults are applied.
    pub fn output(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a subnet for encoders and read their settings
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Elect a device's settings as the control template and preview a merge
    Control(ControlArgs),

    /// Push the control template, merged per device, to a list of targets
    Push(PushArgs),

    /// Push factory-baseline settings to a list of targets
    BulkUpdate(BulkUpdateArgs),

    /// Print the subnet scanned when none is given
    LocalSubnet,

    /// Print the baseline settings document for a device id
    Defaults(DefaultsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DISCOVERY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Scan options shared by every command that discovers first.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Subnet to scan in CIDR notation (default: the local subnet)
    #[arg(long, short = 's')]
    pub subnet: Option<String>,

    /// Per-address probe timeout in milliseconds
    #[arg(long)]
    pub probe_timeout_ms: Option<u64>,

    /// Maximum probes and settings reads in flight
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Per-request timeout for settings reads in milliseconds
    #[arg(long)]
    pub settings_timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Ignore any cached scan of the subnet
    #[arg(long, short = 'r')]
    pub rescan: bool,

    /// Include each device's settings document in structured output
    #[arg(long)]
    pub with_settings: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TEMPLATE & PUSH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ControlArgs {
    /// Address of the device whose settings become the template
    pub address: String,

    /// Device id to preview the merged settings for
    pub target_id: String,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Address of the device whose settings become the template
    #[arg(long, short = 'c')]
    pub control: String,

    /// CSV file of targets (device id, device address)
    pub targets: PathBuf,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Debug, Args)]
pub struct BulkUpdateArgs {
    /// CSV file of targets (device id, device address)
    pub targets: PathBuf,

    /// Job status poll interval in milliseconds
    #[arg(long, default_value = "500")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Args)]
pub struct DefaultsArgs {
    /// Device id spliced into the recording channel folders
    pub id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the resolved configuration (secrets masked)
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Subnet to record as the default scan target
        #[arg(long)]
        subnet: Option<String>,
    },

    /// Store the device password in the system keyring (read from stdin)
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
