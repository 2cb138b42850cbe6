// ── Runtime configuration for the monitoring core ──
//
// Plain, already-validated values. Loading from files and environment
// lives in `nnc-config`, which translates into these types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

use crate::events::DEFAULT_EVENT_QUEUE_CAPACITY;

/// Allowed poll interval range for one multiplexer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLimits {
    pub min: Duration,
    pub default: Duration,
    pub max: Duration,
}

impl PollLimits {
    /// Interface counters: 1s..=30s, default 5s.
    pub const INTERFACE: Self = Self {
        min: Duration::from_secs(1),
        default: Duration::from_secs(5),
        max: Duration::from_secs(30),
    };

    /// Per-service traffic counters: 5s..=60s, default 10s.
    pub const TRAFFIC: Self = Self {
        min: Duration::from_secs(5),
        default: Duration::from_secs(10),
        max: Duration::from_secs(60),
    };

    /// Resolve a requested interval. `None` selects the default; anything
    /// else is clamped into `[min, max]`.
    pub fn clamp(&self, requested: Option<Duration>) -> Duration {
        requested.map_or(self.default, |d| d.clamp(self.min, self.max))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    pub interface: PollLimits,
    pub traffic: PollLimits,
    /// Upper bound on a single device fetch.
    pub fetch_timeout: Duration,
    /// Per-subscriber queue depth.
    pub queue_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interface: PollLimits::INTERFACE,
            traffic: PollLimits::TRAFFIC,
            fetch_timeout: Duration::from_secs(5),
            queue_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// How often each link's probe status is read back.
    pub poll_interval: Duration,
    /// Upper bound on a single probe command.
    pub command_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            command_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// History responses are downsampled to at most this many points.
    pub max_points: usize,
    /// Full-resolution samples kept per resource.
    pub hot_capacity: usize,
    pub cold_retention: TimeDelta,
    /// JSON snapshot of the cold tier. `None` keeps it in memory only.
    pub cold_path: Option<PathBuf>,
    pub maintenance_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_points: 500,
            hot_capacity: 3600,
            cold_retention: TimeDelta::days(30),
            cold_path: None,
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

/// Everything the `Monitoring` facade needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringConfig {
    pub polling: PollingConfig,
    pub health: HealthConfig,
    pub telemetry: TelemetryConfig,
    pub event_queue_capacity: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            health: HealthConfig::default(),
            telemetry: TelemetryConfig::default(),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}
