//! Clap derive structures for the `nnc` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nnc -- live router metrics from the command line
#[derive(Debug, Parser)]
#[command(
    name = "nnc",
    version,
    about = "Watch router interface stats, service traffic and WAN health",
    long_about = "Streams interface counters and per-service traffic from a router,\n\
        monitors WAN reachability through device-side probes, and serves\n\
        downsampled traffic history from the telemetry tiers.\n\n\
        Live commands run against the built-in simulated router.",
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
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "NNC_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log line format (overrides `logging.format`)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output, Color & Log Enums ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one document per line)
    JsonCompact,
    /// Plain text, whitespace separated (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live interface stats or service traffic
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Configure a WAN health check and report its verdict
    Health(HealthArgs),

    /// Query downsampled traffic history
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub command: WatchCommand,
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    /// Interface counters and rates
    #[command(alias = "if")]
    Interface(WatchInterfaceArgs),

    /// Aggregated traffic of one service instance
    Traffic(WatchTrafficArgs),
}

#[derive(Debug, Args)]
pub struct WatchInterfaceArgs {
    /// Router identifier
    #[arg(long, short = 'r', default_value = "sim")]
    pub router: String,

    /// Interface identifier
    #[arg(long, short = 'i')]
    pub interface: String,

    #[command(flatten)]
    pub stream: StreamOpts,
}

#[derive(Debug, Args)]
pub struct WatchTrafficArgs {
    /// Router identifier
    #[arg(long, short = 'r', default_value = "sim")]
    pub router: String,

    /// Service instance identifier
    #[arg(long)]
    pub instance: String,

    #[command(flatten)]
    pub stream: StreamOpts,
}

#[derive(Debug, Args)]
pub struct StreamOpts {
    /// Poll interval, clamped to the configured range (e.g. 5s)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this many updates (default: until interrupted)
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
}

// ── Health ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Router identifier
    #[arg(long, short = 'r', default_value = "sim")]
    pub router: String,

    /// WAN link identifier
    #[arg(long)]
    pub wan: String,

    /// Probe target (repeatable)
    #[arg(long = "target", short = 't', required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Keep monitoring and report transitions for this long
    #[arg(long = "for", value_parser = humantime::parse_duration)]
    pub watch_for: Option<Duration>,

    /// Simulated router: treat this target as unreachable (repeatable)
    #[arg(long = "simulate-down")]
    pub simulate_down: Vec<String>,
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Resource identifier, `router:interface` or `router:instance`
    #[arg(long)]
    pub resource: String,

    /// Window start, relative to now
    #[arg(long, default_value = "2h", value_parser = humantime::parse_duration)]
    pub since: Duration,

    /// Window end, relative to now
    #[arg(long, value_parser = humantime::parse_duration)]
    pub until: Option<Duration>,

    /// Bucket width for the returned points
    #[arg(long, default_value = "5m")]
    pub interval: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
