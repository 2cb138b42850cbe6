// ── Storage tiers ──
//
// Hot:  full resolution ring buffer per resource (last hour).
// Warm: 5-minute rollups (last 24 hours).
// Cold: 1-hour rollups (last N days), optionally snapshotted to disk.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::HistoryPoint;

/// One of the three history resolutions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    /// Oldest data age served by the hot tier (inclusive).
    pub const HOT_WINDOW: TimeDelta = TimeDelta::hours(1);
    /// Oldest data age served by the warm tier (inclusive).
    pub const WARM_WINDOW: TimeDelta = TimeDelta::hours(24);

    /// Select the tier for data of the given age.
    ///
    /// Boundaries are inclusive: exactly one hour is hot, exactly
    /// 24 hours is warm. Negative ages (future start) are hot.
    pub fn for_age(age: TimeDelta) -> Self {
        if age <= Self::HOT_WINDOW {
            Self::Hot
        } else if age <= Self::WARM_WINDOW {
            Self::Warm
        } else {
            Self::Cold
        }
    }

    /// Source resolution of stored points. `None` means raw samples.
    pub fn resolution(self) -> Option<TimeDelta> {
        match self {
            Self::Hot => None,
            Self::Warm => Some(TimeDelta::minutes(5)),
            Self::Cold => Some(TimeDelta::hours(1)),
        }
    }
}

/// Uniform query surface shared by every tier.
pub trait TierStore: Send + Sync {
    fn tier(&self) -> Tier;

    /// Points for `resource_id` within `[start, end]`, oldest first.
    /// Missing samples are absent, never zero-filled.
    fn query(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<HistoryPoint>, CoreError>;
}

// ── Hot tier ─────────────────────────────────────────────────────────

/// Full-resolution samples in a bounded ring per resource.
pub struct HotTier {
    capacity: usize,
    series: DashMap<String, VecDeque<HistoryPoint>>,
}

impl HotTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: DashMap::new(),
        }
    }

    pub fn record(&self, resource_id: &str, point: HistoryPoint) {
        let mut ring = self.series.entry(resource_id.to_owned()).or_default();
        let pos = ring.partition_point(|p| p.timestamp <= point.timestamp);
        ring.insert(pos, point);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Drop samples older than the hot window.
    pub fn prune(&self, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(Tier::HOT_WINDOW) else {
            return;
        };
        self.series.retain(|_, ring| {
            while ring.front().is_some_and(|p| p.timestamp < cutoff) {
                ring.pop_front();
            }
            !ring.is_empty()
        });
    }

    pub fn len(&self, resource_id: &str) -> usize {
        self.series.get(resource_id).map_or(0, |r| r.len())
    }
}

impl TierStore for HotTier {
    fn tier(&self) -> Tier {
        Tier::Hot
    }

    fn query(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        _interval: Duration,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let Some(ring) = self.series.get(resource_id) else {
            return Ok(Vec::new());
        };
        Ok(ring
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .copied()
            .collect())
    }
}

// ── Rollup tiers (warm / cold) ───────────────────────────────────────

/// Running sums for one rollup bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub samples: u64,
    pub tx_bytes_per_sec: f64,
    pub rx_bytes_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_errors: f64,
    pub rx_errors: f64,
}

impl Bucket {
    fn add_point(&mut self, p: &HistoryPoint) {
        self.samples += 1;
        self.tx_bytes_per_sec += p.tx_bytes_per_sec;
        self.rx_bytes_per_sec += p.rx_bytes_per_sec;
        self.tx_packets_per_sec += p.tx_packets_per_sec;
        self.rx_packets_per_sec += p.rx_packets_per_sec;
        self.tx_errors += p.tx_errors;
        self.rx_errors += p.rx_errors;
    }

    fn merge(&mut self, other: &Bucket) {
        self.samples += other.samples;
        self.tx_bytes_per_sec += other.tx_bytes_per_sec;
        self.rx_bytes_per_sec += other.rx_bytes_per_sec;
        self.tx_packets_per_sec += other.tx_packets_per_sec;
        self.rx_packets_per_sec += other.rx_packets_per_sec;
        self.tx_errors += other.tx_errors;
        self.rx_errors += other.rx_errors;
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(&self, timestamp: DateTime<Utc>) -> Option<HistoryPoint> {
        if self.samples == 0 {
            return None;
        }
        let n = self.samples as f64;
        Some(HistoryPoint {
            timestamp,
            tx_bytes_per_sec: self.tx_bytes_per_sec / n,
            rx_bytes_per_sec: self.rx_bytes_per_sec / n,
            tx_packets_per_sec: self.tx_packets_per_sec / n,
            rx_packets_per_sec: self.rx_packets_per_sec / n,
            tx_errors: self.tx_errors / n,
            rx_errors: self.rx_errors / n,
        })
    }
}

/// Serialized form of a rollup tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollupSnapshot {
    pub tier: Option<Tier>,
    pub resolution_secs: i64,
    /// resource id -> bucket start (unix seconds) -> bucket
    pub series: BTreeMap<String, BTreeMap<i64, Bucket>>,
}

/// Fixed-resolution aggregation of samples, keyed by bucket start.
pub struct RollupTier {
    tier: Tier,
    resolution_secs: i64,
    retention: TimeDelta,
    series: DashMap<String, BTreeMap<i64, Bucket>>,
}

impl RollupTier {
    pub fn warm() -> Self {
        Self::new(Tier::Warm, TimeDelta::minutes(5), Tier::WARM_WINDOW)
    }

    pub fn cold(retention: TimeDelta) -> Self {
        Self::new(Tier::Cold, TimeDelta::hours(1), retention)
    }

    fn new(tier: Tier, resolution: TimeDelta, retention: TimeDelta) -> Self {
        Self {
            tier,
            resolution_secs: resolution.num_seconds().max(1),
            retention,
            series: DashMap::new(),
        }
    }

    pub fn record(&self, resource_id: &str, point: &HistoryPoint) {
        let slot = align(point.timestamp.timestamp(), self.resolution_secs);
        self.series
            .entry(resource_id.to_owned())
            .or_default()
            .entry(slot)
            .or_default()
            .add_point(point);
    }

    /// Drop buckets that ended before the retention window. A window
    /// reaching past the earliest representable time keeps everything.
    pub fn prune(&self, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return;
        };
        let cutoff = cutoff.timestamp();
        let resolution = self.resolution_secs;
        self.series.retain(|_, buckets| {
            buckets.retain(|start, _| start + resolution > cutoff);
            !buckets.is_empty()
        });
    }

    pub fn snapshot(&self) -> RollupSnapshot {
        RollupSnapshot {
            tier: Some(self.tier),
            resolution_secs: self.resolution_secs,
            series: self
                .series
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect(),
        }
    }

    /// Merge a previously saved snapshot into this tier.
    pub fn restore(&self, snapshot: RollupSnapshot) -> Result<(), CoreError> {
        if snapshot.resolution_secs != self.resolution_secs {
            return Err(CoreError::Storage {
                message: format!(
                    "{} tier snapshot resolution {}s does not match {}s",
                    self.tier, snapshot.resolution_secs, self.resolution_secs
                ),
            });
        }
        for (resource, buckets) in snapshot.series {
            let mut series = self.series.entry(resource).or_default();
            for (slot, bucket) in buckets {
                series.entry(slot).or_default().merge(&bucket);
            }
        }
        Ok(())
    }

    pub fn bucket_count(&self, resource_id: &str) -> usize {
        self.series.get(resource_id).map_or(0, |b| b.len())
    }
}

impl TierStore for RollupTier {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn query(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let requested = i64::try_from(interval.as_secs()).map_err(|_| CoreError::InvalidInterval {
            value: humantime::format_duration(interval).to_string(),
            reason: "interval is too large".into(),
        })?;
        let step = requested.max(self.resolution_secs);

        let Some(buckets) = self.series.get(resource_id) else {
            return Ok(Vec::new());
        };

        let from = align(start.timestamp(), self.resolution_secs);
        let to = end.timestamp();

        let mut groups: BTreeMap<i64, Bucket> = BTreeMap::new();
        for (slot, bucket) in buckets.range(from..=to) {
            groups.entry(align(*slot, step)).or_default().merge(bucket);
        }

        Ok(groups
            .into_iter()
            .filter_map(|(slot, bucket)| {
                DateTime::from_timestamp(slot, 0).and_then(|ts| bucket.mean(ts))
            })
            .collect())
    }
}

/// Floor `ts` to a multiple of `step` seconds.
fn align(ts: i64, step: i64) -> i64 {
    ts.div_euclid(step) * step
}
