// ── WAN health monitor ──
//
// Each monitored link gets one device-side reachability probe per
// target, tagged with the link's WAN id, plus a local loop that reads
// the probes back and aggregates them into a verdict. Verdicts live in
// their own map so status reads never wait on a reconfiguration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HealthConfig;
use crate::error::CoreError;
use crate::events::{EventPublisher, LinkHealthChange, MetricsEvent};
use crate::model::{HealthCheckConfig, HealthStatus, LinkKey};
use crate::probe::{CommandResult, DeviceCommand, DeviceProbe};

/// Device path of the reachability probe table.
pub const PROBE_PATH: &str = "/tool/netwatch";

/// Comment tag identifying the probes that belong to one WAN link.
pub fn probe_tag(wan_id: &str) -> String {
    format!("WAN Health Check: {wan_id}")
}

/// Aggregate probe reachability into a link verdict.
pub fn aggregate_health(reachable: usize, total: usize) -> HealthStatus {
    HealthStatus::aggregate(reachable, total)
}

#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    probe: Arc<dyn DeviceProbe>,
    events: EventPublisher,
    poll_interval: Duration,
    command_timeout: Duration,
    links: Mutex<HashMap<LinkKey, LinkMonitor>>,
    status: DashMap<LinkKey, HealthStatus>,
    shutdown: CancellationToken,
}

struct LinkMonitor {
    config: HealthCheckConfig,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LinkMonitor {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

impl HealthMonitor {
    pub fn new(probe: Arc<dyn DeviceProbe>, events: EventPublisher, config: &HealthConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe,
                events,
                poll_interval: config.poll_interval,
                command_timeout: config.command_timeout,
                links: Mutex::new(HashMap::new()),
                status: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Apply `config` to `link`, replacing whatever was there.
    ///
    /// An active config removes every tagged probe on the device, adds
    /// one per target and (re)starts the link's loop. An inactive config
    /// stops the loop and resets the verdict to `UNKNOWN`.
    pub async fn configure_health_check(
        &self,
        link: LinkKey,
        config: HealthCheckConfig,
    ) -> Result<(), CoreError> {
        validate(&link, &config)?;
        if self.inner.shutdown.is_cancelled() {
            return Err(CoreError::ShutDown {
                component: "health monitor",
            });
        }

        let mut links = self.inner.links.lock().await;
        if let Some(existing) = links.remove(&link) {
            existing.stop().await;
        }

        if !config.is_active() {
            if let Err(e) = self.inner.remove_probes(&link).await {
                debug!(%link, error = %e, "probe cleanup on disable failed");
            }
            self.inner.status.insert(link.clone(), HealthStatus::Unknown);
            info!(%link, "health monitoring disabled");
            return Ok(());
        }

        if let Err(e) = self.inner.install_probes(&link, &config).await {
            self.inner.status.insert(link.clone(), HealthStatus::Unknown);
            return Err(e);
        }

        let cancel = self.inner.shutdown.child_token();
        let handle = tokio::spawn(Arc::clone(&self.inner).run_link(link.clone(), cancel.clone()));
        info!(%link, targets = config.targets.len(), "health monitoring started");
        links.insert(
            link,
            LinkMonitor {
                config,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Current verdict; `UNKNOWN` for links never configured.
    pub fn get_health_status(&self, link: &LinkKey) -> HealthStatus {
        self.inner
            .status
            .get(link)
            .map_or(HealthStatus::Unknown, |s| *s)
    }

    /// Active configuration for `link`, if it is being monitored.
    pub async fn health_config(&self, link: &LinkKey) -> Option<HealthCheckConfig> {
        self.inner.links.lock().await.get(link).map(|m| m.config.clone())
    }

    pub async fn monitored_links(&self) -> Vec<LinkKey> {
        let mut links: Vec<_> = self.inner.links.lock().await.keys().cloned().collect();
        links.sort();
        links
    }

    /// Run one check outside the schedule and return the resulting verdict.
    pub async fn check_now(&self, link: &LinkKey) -> Result<HealthStatus, CoreError> {
        self.inner.check_health(link).await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop every link's loop and wait for each to exit. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let drained: Vec<_> = self.inner.links.lock().await.drain().collect();
        for (link, monitor) in drained {
            monitor.stop().await;
            debug!(%link, "health loop stopped");
        }
    }
}

fn validate(link: &LinkKey, config: &HealthCheckConfig) -> Result<(), CoreError> {
    if !config.is_active() {
        return Ok(());
    }
    let invalid = |reason: &str| CoreError::InvalidHealthConfig {
        link: link.to_string(),
        reason: reason.to_owned(),
    };
    if config.targets.iter().any(|t| t.trim().is_empty()) {
        return Err(invalid("targets must not be blank"));
    }
    if config.interval_secs == 0 {
        return Err(invalid("interval must be at least 1 second"));
    }
    if config.timeout_secs == 0 {
        return Err(invalid("timeout must be at least 1 second"));
    }
    Ok(())
}

impl Inner {
    // ── Device probes ────────────────────────────────────────────────

    async fn execute(&self, command: &DeviceCommand) -> Result<CommandResult, CoreError> {
        let result = tokio::time::timeout(self.command_timeout, self.probe.execute(command))
            .await
            .map_err(|_| CoreError::ProbeTimeout {
                command: command.to_string(),
                timeout_secs: self.command_timeout.as_secs(),
            })??;
        if !result.success {
            return Err(CoreError::CommandRejected {
                command: command.to_string(),
                message: result.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(result)
    }

    async fn list_probes(&self, link: &LinkKey) -> Result<CommandResult, CoreError> {
        let command =
            DeviceCommand::print(&link.router_id, PROBE_PATH).arg("?comment", probe_tag(&link.wan_id));
        self.execute(&command).await
    }

    /// Remove every probe tagged for `link`. Individual remove failures
    /// are logged and skipped.
    async fn remove_probes(&self, link: &LinkKey) -> Result<(), CoreError> {
        let existing = self.list_probes(link).await?;
        for record in &existing.records {
            let Some(id) = record.get(".id") else {
                continue;
            };
            let command = DeviceCommand::remove(&link.router_id, PROBE_PATH).arg(".id", id);
            if let Err(e) = self.execute(&command).await {
                debug!(%link, probe = %id, error = %e, "probe remove failed");
            }
        }
        Ok(())
    }

    async fn install_probes(&self, link: &LinkKey, config: &HealthCheckConfig) -> Result<(), CoreError> {
        self.remove_probes(link).await?;
        for target in &config.targets {
            let command = DeviceCommand::add(&link.router_id, PROBE_PATH)
                .arg("host", target.trim())
                .arg("interval", format!("{}s", config.interval_secs))
                .arg("timeout", format!("{}s", config.timeout_secs))
                .arg("comment", probe_tag(&link.wan_id));
            self.execute(&command).await?;
        }
        Ok(())
    }

    // ── Polling ──────────────────────────────────────────────────────

    async fn run_link(self: Arc<Self>, link: LinkKey, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let checked = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        r = self.check_health(&link) => r,
                    };
                    if let Err(e) = checked {
                        debug!(%link, error = %e, "health check failed");
                    }
                }
            }
        }
    }

    async fn check_health(&self, link: &LinkKey) -> Result<HealthStatus, CoreError> {
        let probes = self.list_probes(link).await?;
        let total = probes.records.len();
        let reachable = probes
            .records
            .iter()
            .filter(|r| r.get("status").is_some_and(|s| s == "up"))
            .count();

        let current = aggregate_health(reachable, total);
        let previous = self
            .status
            .insert(link.clone(), current)
            .unwrap_or_default();

        if current != previous {
            info!(%link, %previous, %current, reachable, total, "WAN health changed");
            let published = self.events.publish(MetricsEvent::link_health(LinkHealthChange {
                link: link.clone(),
                previous,
                current,
                reachable,
                total,
                checked_at: Utc::now(),
            }));
            if !published {
                warn!(%link, "health change event dropped");
            }
        }
        Ok(current)
    }
}
