// ── Core error types ──
//
// Errors surfaced to callers of the query/configure APIs. Transient
// probe failures inside poll loops never reach this type -- they are
// logged and the next tick is the retry.

use thiserror::Error;

use crate::probe::ProbeError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Invalid interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Invalid health check configuration for {link}: {reason}")]
    InvalidHealthConfig { link: String, reason: String },

    // ── Capability errors ────────────────────────────────────────────
    #[error("Required capability '{capability}' was not provided")]
    CapabilityUnavailable { capability: &'static str },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Device probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Device rejected {command}: {message}")]
    CommandRejected { command: String, message: String },

    #[error("Device command {command} timed out after {timeout_secs}s")]
    ProbeTimeout { command: String, timeout_secs: u64 },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("{component} has been shut down")]
    ShutDown { component: &'static str },

    // ── Storage errors ───────────────────────────────────────────────
    #[error("Telemetry storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage {
            message: format!("snapshot encoding failed: {err}"),
        }
    }
}
