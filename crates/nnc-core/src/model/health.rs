// ── WAN health types ──

use serde::{Deserialize, Serialize};

/// Aggregated reachability verdict for one monitored link.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HealthStatus {
    /// Every target is reachable.
    Healthy,
    /// Some, but not all, targets are reachable.
    Degraded,
    /// No target is reachable.
    Down,
    /// Monitoring is disabled, unconfigured, or no probe reported.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Aggregate probe reachability into a verdict.
    ///
    /// No smoothing is applied: the verdict reflects the latest poll.
    /// `failure_threshold` only latches each device-side probe.
    pub fn aggregate(reachable: usize, total: usize) -> Self {
        if total == 0 {
            Self::Unknown
        } else if reachable >= total {
            Self::Healthy
        } else if reachable > 0 {
            Self::Degraded
        } else {
            Self::Down
        }
    }
}

/// Health check settings for one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    /// Target IPs or hostnames probed from the router.
    pub targets: Vec<String>,
    /// Device-side probe interval in seconds.
    pub interval_secs: u32,
    /// Device-side probe timeout in seconds.
    pub timeout_secs: u32,
    /// Consecutive failures before a single probe latches down.
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            targets: Vec::new(),
            interval_secs: 10,
            timeout_secs: 2,
            failure_threshold: 3,
        }
    }
}

impl HealthCheckConfig {
    /// Enabled configuration for the given targets with default timings.
    pub fn for_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether this configuration results in active monitoring.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.targets.is_empty()
    }
}
