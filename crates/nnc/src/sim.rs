//! Built-in simulated router.
//!
//! Answers the interface counter and netwatch commands a real router
//! would. Counters grow with wall-clock time at a fixed per-interface
//! rate, so consecutive polls yield steady, plausible rates.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use nnc_core::health::PROBE_PATH;
use nnc_core::poller::SERVICE_COMMENT_PREFIX;
use nnc_core::{CommandAction, CommandResult, DeviceCommand, DeviceProbe, ProbeError, Record};

/// Counter value at process start, so the first sample is not zero.
const BASE_COUNTER: u64 = 1_000_000;
/// Average packet size used to derive packet counters.
const PACKET_BYTES: u64 = 1_200;
/// Virtual interfaces created per service instance.
const SERVICE_INTERFACES: usize = 2;

pub struct SimulatedRouter {
    started: Instant,
    netwatch: Mutex<Vec<Record>>,
    next_probe_id: AtomicUsize,
    down_hosts: HashSet<String>,
}

impl SimulatedRouter {
    pub fn new() -> Arc<Self> {
        Self::with_down_hosts(std::iter::empty::<String>())
    }

    /// A router on which probes to `hosts` always report down.
    pub fn with_down_hosts<I, S>(hosts: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            started: Instant::now(),
            netwatch: Mutex::new(Vec::new()),
            next_probe_id: AtomicUsize::new(1),
            down_hosts: hosts.into_iter().map(Into::into).collect(),
        })
    }

    // ── Interface counters ───────────────────────────────────────────

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn interface_record(&self, name: &str, comment: Option<&str>) -> Record {
        let elapsed_ms = self.elapsed_ms();
        let tx = BASE_COUNTER + base_rate(name).saturating_mul(elapsed_ms) / 1000;
        let rx = tx.saturating_mul(3);
        let drops = elapsed_ms / 60_000;

        let mut record = Record::from([
            ("name".to_owned(), name.to_owned()),
            ("tx-byte".to_owned(), tx.to_string()),
            ("rx-byte".to_owned(), rx.to_string()),
            ("tx-packet".to_owned(), (tx / PACKET_BYTES).to_string()),
            ("rx-packet".to_owned(), (rx / PACKET_BYTES).to_string()),
            ("tx-error".to_owned(), "0".to_owned()),
            ("rx-error".to_owned(), "0".to_owned()),
            ("tx-drop".to_owned(), drops.to_string()),
            ("rx-drop".to_owned(), drops.to_string()),
        ]);
        if let Some(comment) = comment {
            record.insert("comment".to_owned(), comment.to_owned());
        }
        record
    }

    fn service_records(&self, comment: &str) -> Vec<Record> {
        let Some(instance) = comment.strip_prefix(SERVICE_COMMENT_PREFIX) else {
            return Vec::new();
        };
        (0..SERVICE_INTERFACES)
            .map(|n| self.interface_record(&format!("{instance}-tun{n}"), Some(comment)))
            .collect()
    }

    // ── Netwatch table ───────────────────────────────────────────────

    fn netwatch(&self, command: &DeviceCommand) -> CommandResult {
        match command.action {
            CommandAction::Add => {
                let Some(host) = command.arg_value("host") else {
                    return CommandResult::failed("missing host");
                };
                let id = self.next_probe_id.fetch_add(1, Ordering::Relaxed);
                let mut record = Record::from([
                    (".id".to_owned(), format!("*{id}")),
                    ("host".to_owned(), host.to_owned()),
                ]);
                for key in ["interval", "timeout", "comment"] {
                    if let Some(value) = command.arg_value(key) {
                        record.insert(key.to_owned(), value.to_owned());
                    }
                }
                self.netwatch.lock().push(record);
                CommandResult::ok(Vec::new())
            }
            CommandAction::Remove => {
                let Some(id) = command.arg_value(".id") else {
                    return CommandResult::failed("missing .id");
                };
                let mut table = self.netwatch.lock();
                let before = table.len();
                table.retain(|r| r.get(".id").is_none_or(|v| v != id));
                if table.len() == before {
                    return CommandResult::failed(format!("no such item ({id})"));
                }
                CommandResult::ok(Vec::new())
            }
            CommandAction::Print => {
                let comment = command.arg_value("?comment");
                let records = self
                    .netwatch
                    .lock()
                    .iter()
                    .filter(|r| comment.is_none_or(|c| r.get("comment").is_some_and(|v| v == c)))
                    .cloned()
                    .map(|mut r| {
                        let up = r.get("host").is_some_and(|h| !self.down_hosts.contains(h));
                        r.insert("status".to_owned(), if up { "up" } else { "down" }.to_owned());
                        r
                    })
                    .collect();
                CommandResult::ok(records)
            }
        }
    }
}

/// Steady per-interface byte rate, between 125 kB/s and 1 MB/s.
fn base_rate(name: &str) -> u64 {
    let hash = name
        .bytes()
        .fold(0_u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
    125_000 * (1 + hash % 8)
}

#[async_trait]
impl DeviceProbe for SimulatedRouter {
    async fn execute(&self, command: &DeviceCommand) -> Result<CommandResult, ProbeError> {
        trace!(%command, "simulated router command");
        match (command.path.as_str(), command.action) {
            ("/interface", CommandAction::Print) => {
                if let Some(id) = command.arg_value(".id") {
                    Ok(CommandResult::ok(vec![self.interface_record(id, None)]))
                } else if let Some(comment) = command.arg_value("?comment") {
                    Ok(CommandResult::ok(self.service_records(comment)))
                } else {
                    Err(ProbeError::Malformed("interface print needs a selector".into()))
                }
            }
            ("/interface", action) => Ok(CommandResult::failed(format!(
                "interface {action} is not supported"
            ))),
            (path, _) if path == PROBE_PATH => Ok(self.netwatch(command)),
            (other, _) => Err(ProbeError::Malformed(format!("no such command path {other}"))),
        }
    }
}
