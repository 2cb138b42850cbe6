//! Scripted test doubles for the device probe and event sink.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nnc_core::{
    CommandAction, CommandResult, DeviceCommand, DeviceProbe, EventPublisher, EventSink,
    LinkHealthChange, MetricsEvent, ProbeError, Record, SinkError,
};
use parking_lot::Mutex;

// ── ScriptedProbe ───────────────────────────────────────────────────

/// In-memory router: monotonically growing interface counters and a
/// netwatch-style probe table.
#[derive(Default)]
pub struct ScriptedProbe {
    fetches: Mutex<HashMap<String, u64>>,
    fail: AtomicBool,
    empty: AtomicBool,
    delay_ms: AtomicU64,
    reject_adds: AtomicBool,
    netwatch: Mutex<Vec<Record>>,
    next_probe_id: AtomicUsize,
    down_hosts: Mutex<Vec<String>>,
    commands: Mutex<Vec<DeviceCommand>>,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every counter fetch fail with a transport error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make counter fetches succeed with zero records.
    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    /// Delay every command by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    pub fn set_reject_adds(&self, reject: bool) {
        self.reject_adds.store(reject, Ordering::SeqCst);
    }

    pub fn set_host_up(&self, host: &str, up: bool) {
        let mut down = self.down_hosts.lock();
        down.retain(|h| h != host);
        if !up {
            down.push(host.to_owned());
        }
    }

    /// Counter fetches attempted for `resource` (interface id or comment).
    pub fn fetches(&self, resource: &str) -> u64 {
        self.fetches.lock().get(resource).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u64 {
        self.fetches.lock().values().sum()
    }

    /// Netwatch entries carrying `comment`.
    pub fn probes_tagged(&self, comment: &str) -> Vec<Record> {
        self.netwatch
            .lock()
            .iter()
            .filter(|r| r.get("comment").is_some_and(|c| c == comment))
            .cloned()
            .collect()
    }

    /// Insert a netwatch entry directly, as if left over from earlier.
    pub fn seed_probe(&self, host: &str, comment: &str) {
        let record = self.new_probe(host, comment);
        self.netwatch.lock().push(record);
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().clone()
    }

    fn new_probe(&self, host: &str, comment: &str) -> Record {
        let id = self.next_probe_id.fetch_add(1, Ordering::SeqCst);
        Record::from([
            (".id".to_owned(), format!("*{id}")),
            ("host".to_owned(), host.to_owned()),
            ("comment".to_owned(), comment.to_owned()),
        ])
    }

    fn counters(&self, resource: &str, interfaces: usize) -> CommandResult {
        let n = {
            let mut fetches = self.fetches.lock();
            let n = fetches.entry(resource.to_owned()).or_default();
            *n += 1;
            *n
        };
        if self.fail.load(Ordering::SeqCst) {
            return CommandResult::failed("interface not found");
        }
        if self.empty.load(Ordering::SeqCst) {
            return CommandResult::ok(Vec::new());
        }
        let records = (0..interfaces)
            .map(|_| {
                Record::from([
                    ("tx-byte".to_owned(), (n * 1000).to_string()),
                    ("rx-byte".to_owned(), (n * 2000).to_string()),
                    ("tx-packet".to_owned(), (n * 10).to_string()),
                    ("rx-packet".to_owned(), (n * 20).to_string()),
                ])
            })
            .collect();
        CommandResult::ok(records)
    }

    fn netwatch(&self, command: &DeviceCommand) -> CommandResult {
        match command.action {
            CommandAction::Add => {
                if self.reject_adds.load(Ordering::SeqCst) {
                    return CommandResult::failed("failure: entry limit reached");
                }
                let record = self.new_probe(
                    command.arg_value("host").unwrap_or_default(),
                    command.arg_value("comment").unwrap_or_default(),
                );
                self.netwatch.lock().push(record);
                CommandResult::ok(Vec::new())
            }
            CommandAction::Remove => {
                let id = command.arg_value(".id").unwrap_or_default();
                self.netwatch
                    .lock()
                    .retain(|r| r.get(".id").is_none_or(|v| v != id));
                CommandResult::ok(Vec::new())
            }
            CommandAction::Print => {
                let comment = command.arg_value("?comment").unwrap_or_default();
                let down = self.down_hosts.lock().clone();
                let records = self
                    .probes_tagged(comment)
                    .into_iter()
                    .map(|mut r| {
                        let host = r.get("host").cloned().unwrap_or_default();
                        let status = if down.contains(&host) { "down" } else { "up" };
                        r.insert("status".to_owned(), status.to_owned());
                        r
                    })
                    .collect();
                CommandResult::ok(records)
            }
        }
    }
}

#[async_trait]
impl DeviceProbe for ScriptedProbe {
    async fn execute(&self, command: &DeviceCommand) -> Result<CommandResult, ProbeError> {
        self.commands.lock().push(command.clone());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match command.path.as_str() {
            "/interface" => {
                if let Some(id) = command.arg_value(".id") {
                    Ok(self.counters(id, 1))
                } else if let Some(comment) = command.arg_value("?comment") {
                    Ok(self.counters(comment, 2))
                } else {
                    Err(ProbeError::Malformed("missing selector".into()))
                }
            }
            "/tool/netwatch" => Ok(self.netwatch(command)),
            other => Err(ProbeError::Transport(format!("unknown path {other}"))),
        }
    }
}

// ── RecordingSink ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MetricsEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.lock().clone()
    }

    pub fn health_changes(&self) -> Vec<LinkHealthChange> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MetricsEvent::LinkHealthChanged { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: &MetricsEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

// ── StallingSink ────────────────────────────────────────────────────

/// A sink whose publish never completes.
#[derive(Default)]
pub struct StallingSink {
    calls: AtomicUsize,
}

impl StallingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for StallingSink {
    async fn publish(&self, _event: &MetricsEvent) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// A publisher that forwards into a fresh recording sink.
pub fn recording_publisher() -> (EventPublisher, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let publisher = EventPublisher::start(sink.clone(), 64);
    (publisher, sink)
}

/// Let spawned tasks run without moving the paused clock meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
