//! Real-time router metrics between the device layer and its consumers.
//!
//! Everything device-facing goes through a [`DeviceProbe`], and
//! everything outbound goes through an [`EventSink`]:
//!
//! - **[`SessionMultiplexer`]**: one poll loop per resource key, fanned
//!   out to any number of subscriber feeds. [`InterfaceStatsPoller`] and
//!   [`ServiceTrafficPoller`] are the two instances.
//! - **[`HealthMonitor`]**: provisions reachability probes per WAN link
//!   and publishes a [`LinkHealthChange`] whenever the verdict moves.
//! - **[`TelemetryStore`]**: hot, warm and cold history tiers with
//!   downsampled range queries and an optional on-disk cold snapshot.
//! - **[`Monitoring`]**: owns all of the above and stops them in order.

pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod model;
pub mod monitoring;
pub mod poller;
pub mod probe;
pub mod telemetry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{HealthConfig, MonitoringConfig, PollLimits, PollingConfig, TelemetryConfig};
pub use error::CoreError;
pub use events::{EventPublisher, EventSink, FanoutSink, LinkHealthChange, MetricsEvent, SinkError};
pub use health::HealthMonitor;
pub use monitoring::{Monitoring, MonitoringBuilder};
pub use poller::{
    Feed, InterfaceFeed, InterfaceStatsPoller, PollSource, ServiceTrafficFeed, ServiceTrafficPoller,
    SessionInfo, SessionMultiplexer,
};
pub use probe::{CommandAction, CommandResult, DeviceCommand, DeviceProbe, ProbeError, Record};
pub use telemetry::{StatsHistory, TelemetryStore, Tier, calculate_rate, downsample};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    HealthCheckConfig, HealthStatus, HistoryPoint, InterfaceKey, InterfaceStats, LinkKey,
    ServiceKey, ServiceTraffic,
};
