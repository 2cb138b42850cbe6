//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use nnc_config::ConfigError;
use nnc_core::{CoreError, ProbeError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const DEVICE: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────
    #[error("Router {router} could not be reached: {reason}")]
    #[diagnostic(
        code(nnc::device_unreachable),
        help("Check the router id. Live commands only reach the built-in simulated router.")
    )]
    DeviceUnreachable { router: String, reason: String },

    #[error("Router rejected {command}: {message}")]
    #[diagnostic(code(nnc::command_rejected))]
    CommandRejected { command: String, message: String },

    #[error("Router command {command} timed out after {seconds}s")]
    #[diagnostic(
        code(nnc::timeout),
        help("Raise health.command_timeout_secs or check router responsiveness.")
    )]
    Timeout { command: String, seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nnc::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid interval '{value}': {reason}")]
    #[diagnostic(code(nnc::interval), help("Use a duration such as 30s, 5m or 1h."))]
    InvalidInterval { value: String, reason: String },

    #[error("Invalid time range: {start} is after {end}")]
    #[diagnostic(code(nnc::time_range), help("--since must reach further back than --until."))]
    InvalidTimeRange { start: String, end: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Config file already exists at {path}")]
    #[diagnostic(code(nnc::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error("Configuration is invalid: {0}")]
    #[diagnostic(
        code(nnc::config),
        help("Fix the config file (nnc config path) or the NNC_* environment variables.")
    )]
    Config(Box<ConfigError>),

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Telemetry storage error: {message}")]
    #[diagnostic(code(nnc::storage))]
    Storage { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {message}")]
    #[diagnostic(code(nnc::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(nnc::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceUnreachable { .. } | Self::CommandRejected { .. } => exit_code::DEVICE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::InvalidInterval { .. }
            | Self::InvalidTimeRange { .. }
            | Self::ConfigExists { .. }
            | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInterval { value, reason } => {
                CliError::InvalidInterval { value, reason }
            }

            CoreError::InvalidTimeRange { start, end } => CliError::InvalidTimeRange { start, end },

            CoreError::InvalidHealthConfig { link, reason } => CliError::Validation {
                field: format!("health check for {link}"),
                reason,
            },

            CoreError::Probe(ProbeError::Unreachable { router_id, reason }) => {
                CliError::DeviceUnreachable {
                    router: router_id,
                    reason,
                }
            }

            CoreError::Probe(other) => CliError::DeviceUnreachable {
                router: "(transport)".into(),
                reason: other.to_string(),
            },

            CoreError::CommandRejected { command, message } => {
                CliError::CommandRejected { command, message }
            }

            CoreError::ProbeTimeout {
                command,
                timeout_secs,
            } => CliError::Timeout {
                command,
                seconds: timeout_secs,
            },

            CoreError::Storage { message } => CliError::Storage { message },

            CoreError::Io(e) => CliError::Io(e),

            other @ (CoreError::CapabilityUnavailable { .. } | CoreError::ShutDown { .. }) => {
                CliError::Internal {
                    message: other.to_string(),
                }
            }
        }
    }
}
