// ── Device command boundary ──
//
// The device-command execution layer is opaque to this crate. A
// `DeviceProbe` turns a structured `DeviceCommand` into key/value
// records or fails. Nothing here knows how commands travel on the wire.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One key/value record returned by a device command.
pub type Record = HashMap<String, String>;

/// Command verbs understood by every device backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Print,
    Add,
    Remove,
}

/// A structured command addressed to one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub router_id: String,
    pub path: String,
    pub action: CommandAction,
    pub args: BTreeMap<String, String>,
}

impl DeviceCommand {
    pub fn new(router_id: impl Into<String>, path: impl Into<String>, action: CommandAction) -> Self {
        Self {
            router_id: router_id.into(),
            path: path.into(),
            action,
            args: BTreeMap::new(),
        }
    }

    pub fn print(router_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(router_id, path, CommandAction::Print)
    }

    pub fn add(router_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(router_id, path, CommandAction::Add)
    }

    pub fn remove(router_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(router_id, path, CommandAction::Remove)
    }

    /// Attach an argument (builder style).
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn arg_value(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.path, self.router_id, self.action)
    }
}

/// Outcome of a device command that reached the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub records: Vec<Record>,
    pub success: bool,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(records: Vec<Record>) -> Self {
        Self {
            records,
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Transport-level probe failure (the command never produced a result).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("router {router_id} is not reachable: {reason}")]
    Unreachable { router_id: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Capability that executes commands against routers.
///
/// Implementations may be slow and may fail transiently. Callers never
/// retry blindly: a command that times out may or may not have taken
/// effect on the device.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn execute(&self, command: &DeviceCommand) -> Result<CommandResult, ProbeError>;
}

// ── Record field helpers ─────────────────────────────────────────────

/// Parse a counter field, treating absent or malformed values as zero.
pub(crate) fn counter(record: &Record, key: &str) -> u64 {
    record
        .get(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// True when at least one of `keys` is present in the record.
pub(crate) fn has_any(record: &Record, keys: &[&str]) -> bool {
    keys.iter().any(|k| record.contains_key(*k))
}
