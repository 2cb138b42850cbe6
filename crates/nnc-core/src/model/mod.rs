// ── Domain model ──
//
// Resource keys, data points produced by poll cycles, and WAN health
// types. All data points are immutable once broadcast.

pub mod health;
pub mod keys;
pub mod stats;

pub use health::{HealthCheckConfig, HealthStatus};
pub use keys::{InterfaceKey, LinkKey, ServiceKey};
pub use stats::{HistoryPoint, InterfaceStats, ServiceTraffic};
