//! Shared configuration for the nnc tools.
//!
//! TOML file + `NNC_` environment overrides, validation, and translation
//! to `nnc_core::MonitoringConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nnc_core::{
    HealthCheckConfig, HealthConfig, MonitoringConfig, PollLimits, PollingConfig, TelemetryConfig,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub polling: PollingSection,
    pub health: HealthSection,
    pub telemetry: TelemetrySection,
    pub events: EventsSection,
    pub logging: LoggingSection,
}

/// Allowed poll interval range, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntervalLimits {
    pub min_secs: u64,
    pub default_secs: u64,
    pub max_secs: u64,
}

impl IntervalLimits {
    fn to_limits(self) -> PollLimits {
        PollLimits {
            min: Duration::from_secs(self.min_secs),
            default: Duration::from_secs(self.default_secs),
            max: Duration::from_secs(self.max_secs),
        }
    }

    fn validate(self, field: &str) -> Result<(), ConfigError> {
        if self.min_secs == 0 {
            return Err(invalid(format!("{field}.min_secs"), "must be at least 1"));
        }
        if self.min_secs > self.default_secs || self.default_secs > self.max_secs {
            return Err(invalid(
                field.to_owned(),
                format!(
                    "expected min <= default <= max, got {} / {} / {}",
                    self.min_secs, self.default_secs, self.max_secs
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingSection {
    pub interface: IntervalLimits,
    pub traffic: IntervalLimits,
    pub fetch_timeout_secs: u64,
    pub queue_capacity: usize,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interface: IntervalLimits {
                min_secs: 1,
                default_secs: 5,
                max_secs: 30,
            },
            traffic: IntervalLimits {
                min_secs: 5,
                default_secs: 10,
                max_secs: 60,
            },
            fetch_timeout_secs: 5,
            queue_capacity: 10,
        }
    }
}

/// Health monitor settings plus the defaults applied to new links.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthSection {
    pub poll_interval_secs: u64,
    pub command_timeout_secs: u64,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub failure_threshold: u32,
}

impl Default for HealthSection {
    fn default() -> Self {
        let check = HealthCheckConfig::default();
        Self {
            poll_interval_secs: 10,
            command_timeout_secs: 5,
            interval_secs: check.interval_secs,
            timeout_secs: check.timeout_secs,
            failure_threshold: check.failure_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub max_points: usize,
    pub hot_capacity: usize,
    pub cold_retention_days: u32,
    /// JSON snapshot of the cold tier (in-memory only when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_path: Option<PathBuf>,
    pub maintenance_interval_secs: u64,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            max_points: 500,
            hot_capacity: 3600,
            cold_retention_days: 30,
            cold_path: None,
            maintenance_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsSection {
    pub queue_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            queue_capacity: nnc_core::events::DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

// ── Validation and translation ──────────────────────────────────────

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn non_zero<T: PartialEq + Default>(value: T, field: &str) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

/// Upper bound on `telemetry.cold_retention_days` (ten years).
pub const MAX_COLD_RETENTION_DAYS: u32 = 3650;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.polling.interface.validate("polling.interface")?;
        self.polling.traffic.validate("polling.traffic")?;
        non_zero(self.polling.fetch_timeout_secs, "polling.fetch_timeout_secs")?;
        non_zero(self.polling.queue_capacity, "polling.queue_capacity")?;

        non_zero(self.health.poll_interval_secs, "health.poll_interval_secs")?;
        non_zero(self.health.command_timeout_secs, "health.command_timeout_secs")?;
        non_zero(self.health.interval_secs, "health.interval_secs")?;
        non_zero(self.health.timeout_secs, "health.timeout_secs")?;

        non_zero(self.telemetry.max_points, "telemetry.max_points")?;
        non_zero(self.telemetry.hot_capacity, "telemetry.hot_capacity")?;
        non_zero(self.telemetry.cold_retention_days, "telemetry.cold_retention_days")?;
        if self.telemetry.cold_retention_days > MAX_COLD_RETENTION_DAYS {
            return Err(invalid(
                "telemetry.cold_retention_days",
                format!("must be at most {MAX_COLD_RETENTION_DAYS}"),
            ));
        }
        non_zero(
            self.telemetry.maintenance_interval_secs,
            "telemetry.maintenance_interval_secs",
        )?;

        non_zero(self.events.queue_capacity, "events.queue_capacity")?;

        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging.level", "must not be empty"));
        }
        Ok(())
    }

    /// Translate into the core runtime configuration.
    pub fn to_monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            polling: PollingConfig {
                interface: self.polling.interface.to_limits(),
                traffic: self.polling.traffic.to_limits(),
                fetch_timeout: Duration::from_secs(self.polling.fetch_timeout_secs),
                queue_capacity: self.polling.queue_capacity,
            },
            health: HealthConfig {
                poll_interval: Duration::from_secs(self.health.poll_interval_secs),
                command_timeout: Duration::from_secs(self.health.command_timeout_secs),
            },
            telemetry: TelemetryConfig {
                max_points: self.telemetry.max_points,
                hot_capacity: self.telemetry.hot_capacity,
                cold_retention: TimeDelta::days(i64::from(self.telemetry.cold_retention_days)),
                cold_path: self.telemetry.cold_path.clone(),
                maintenance_interval: Duration::from_secs(self.telemetry.maintenance_interval_secs),
            },
            event_queue_capacity: self.events.queue_capacity,
        }
    }

    /// An enabled health check for `targets` using the configured defaults.
    pub fn health_check<I, S>(&self, targets: I) -> HealthCheckConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HealthCheckConfig {
            interval_secs: self.health.interval_secs,
            timeout_secs: self.health.timeout_secs,
            failure_threshold: self.health.failure_threshold,
            ..HealthCheckConfig::for_targets(targets)
        }
    }

    /// Cold snapshot location: the configured path, else the platform data dir.
    pub fn cold_path_or_default(&self) -> PathBuf {
        self.telemetry
            .cold_path
            .clone()
            .unwrap_or_else(default_cold_path)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "nnc", "nnc")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nnc");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the cold tier snapshot.
pub fn default_cold_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("cold-tier.json"),
        |dirs| dirs.data_dir().join("cold-tier.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate config from `path` + environment.
///
/// A missing file is not an error; defaults and `NNC_*` variables
/// (nested keys split on `__`, e.g. `NNC_TELEMETRY__MAX_POINTS`) apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NNC_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to pretty TOML at `path`, creating its directory.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_core() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let core = config.to_monitoring_config();
        assert_eq!(core, MonitoringConfig::default());
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let mut config = Config::default();
        config.polling.traffic.default_secs = 90;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("polling.traffic"), "{err}");
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let mut config = Config::default();
        config.events.queue_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "events.queue_capacity"
        ));
    }

    #[test]
    fn cold_retention_is_capped() {
        let mut config = Config::default();
        config.telemetry.cold_retention_days = MAX_COLD_RETENTION_DAYS;
        assert!(config.validate().is_ok());

        config.telemetry.cold_retention_days = 100_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "telemetry.cold_retention_days"
        ));
    }

    #[test]
    fn health_check_uses_section_defaults() {
        let mut config = Config::default();
        config.health.timeout_secs = 4;
        let check = config.health_check(["1.1.1.1"]);
        assert!(check.enabled);
        assert_eq!(check.timeout_secs, 4);
        assert_eq!(check.targets, vec!["1.1.1.1".to_owned()]);
    }
}
