// ── Tiered telemetry store ──
//
// Routes a history query to exactly one tier by the age of its start
// time, then downsamples the series. Tiers are never merged within a
// single request; a range crossing a boundary is served at the
// resolution of the tier its start falls in.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::downsample::downsample;
use super::tier::{HotTier, RollupSnapshot, RollupTier, Tier, TierStore};
use crate::config::TelemetryConfig;
use crate::error::CoreError;
use crate::events::{EventSink, MetricsEvent, SinkError};
use crate::model::{HistoryPoint, InterfaceKey, ServiceKey};

/// A bounded historical series for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsHistory {
    pub resource_id: String,
    /// Tier the series was served from.
    pub tier: Tier,
    #[serde(with = "humantime_serde_secs")]
    pub interval: Duration,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub points: Vec<HistoryPoint>,
}

/// Parse a humantime interval such as `30s`, `5m` or `1h`.
pub fn parse_interval(raw: &str) -> Result<Duration, CoreError> {
    let interval = humantime::parse_duration(raw.trim()).map_err(|e| CoreError::InvalidInterval {
        value: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if interval.is_zero() {
        return Err(CoreError::InvalidInterval {
            value: raw.to_owned(),
            reason: "interval must be greater than zero".into(),
        });
    }
    Ok(interval)
}

pub struct TelemetryStore {
    hot: HotTier,
    warm: RollupTier,
    cold: RollupTier,
    config: TelemetryConfig,
}

impl TelemetryStore {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            hot: HotTier::new(config.hot_capacity),
            warm: RollupTier::warm(),
            cold: RollupTier::cold(config.cold_retention),
            config,
        }
    }

    /// Create a store and restore the cold tier from its snapshot, if any.
    pub fn open(config: TelemetryConfig) -> Result<Self, CoreError> {
        let store = Self::new(config);
        store.load_cold()?;
        Ok(store)
    }

    /// Feed one sample into every tier.
    pub fn record(&self, resource_id: &str, point: HistoryPoint) {
        self.hot.record(resource_id, point);
        self.warm.record(resource_id, &point);
        self.cold.record(resource_id, &point);
    }

    pub fn get_history(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<StatsHistory, CoreError> {
        self.get_history_at(Utc::now(), resource_id, start, end, interval)
    }

    /// Same as [`get_history`](Self::get_history) with an explicit clock.
    pub fn get_history_at(
        &self,
        now: DateTime<Utc>,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<StatsHistory, CoreError> {
        let interval = parse_interval(interval)?;
        let tier = Tier::for_age(now - start);
        self.query(tier, resource_id, start, end, interval)
    }

    /// Query one tier directly, bypassing age-based selection.
    pub fn query_tier(
        &self,
        tier: Tier,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<StatsHistory, CoreError> {
        let interval = parse_interval(interval)?;
        self.query(tier, resource_id, start, end, interval)
    }

    fn query(
        &self,
        tier: Tier,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<StatsHistory, CoreError> {
        if start > end {
            return Err(CoreError::InvalidTimeRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        let raw = self.tier(tier).query(resource_id, start, end, interval)?;
        let raw_len = raw.len();
        let points = downsample(raw, self.config.max_points);
        debug!(
            resource = resource_id,
            %tier,
            raw = raw_len,
            returned = points.len(),
            "history query"
        );

        Ok(StatsHistory {
            resource_id: resource_id.to_owned(),
            tier,
            interval,
            start,
            end,
            points,
        })
    }

    fn tier(&self, tier: Tier) -> &dyn TierStore {
        match tier {
            Tier::Hot => &self.hot,
            Tier::Warm => &self.warm,
            Tier::Cold => &self.cold,
        }
    }

    /// Drop data that has aged out of each tier.
    pub fn prune(&self, now: DateTime<Utc>) {
        self.hot.prune(now);
        self.warm.prune(now);
        self.cold.prune(now);
    }

    pub fn cold_path(&self) -> Option<&Path> {
        self.config.cold_path.as_deref()
    }

    // ── Cold tier persistence ────────────────────────────────────────

    /// Merge the on-disk cold snapshot into memory. A missing file is
    /// not an error.
    pub fn load_cold(&self) -> Result<(), CoreError> {
        let Some(path) = self.cold_path() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: RollupSnapshot = serde_json::from_str(&raw)?;
        self.cold.restore(snapshot)?;
        debug!(path = %path.display(), "cold tier restored");
        Ok(())
    }

    /// Write the cold tier to its snapshot file via temp file + rename.
    pub fn persist_cold(&self) -> Result<(), CoreError> {
        let Some(path) = self.cold_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.cold.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Periodically prune and persist until `cancel` fires, then persist
    /// one last time. Snapshot writes run on the blocking pool.
    pub fn spawn_maintenance(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let period = self.config.maintenance_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        store.prune(Utc::now());
                        persist_blocking(&store, "cold tier persist").await;
                    }
                }
            }

            persist_blocking(&store, "final cold tier persist").await;
            debug!("telemetry maintenance stopped");
        })
    }
}

async fn persist_blocking(store: &Arc<TelemetryStore>, what: &'static str) {
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || store.persist_cold()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "{what} failed"),
        Err(e) => warn!(error = %e, "{what} task aborted"),
    }
}

/// Stats updates published on the event bus land in the tiers.
#[async_trait]
impl EventSink for TelemetryStore {
    async fn publish(&self, event: &MetricsEvent) -> Result<(), SinkError> {
        match event {
            MetricsEvent::InterfaceStatsUpdated { stats, .. } => {
                let key = InterfaceKey::new(&stats.router_id, &stats.interface_id);
                self.record(&key.to_string(), stats.to_history_point());
            }
            MetricsEvent::ServiceTrafficUpdated { traffic, .. } => {
                let key = ServiceKey::new(&traffic.router_id, &traffic.instance_id);
                self.record(&key.to_string(), traffic.to_history_point());
            }
            MetricsEvent::LinkHealthChanged { .. } => {}
        }
        Ok(())
    }
}

mod humantime_serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
