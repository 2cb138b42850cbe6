// ── Traffic data points ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One interface counter snapshot produced by a poll cycle.
///
/// Counters are cumulative as reported by the device. Rates are computed
/// against the previous sample of the same session and are zero for the
/// first sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub router_id: String,
    pub interface_id: String,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_errors: u64,
    pub rx_errors: u64,
    pub tx_drops: u64,
    pub rx_drops: u64,
    pub tx_bytes_per_sec: f64,
    pub rx_bytes_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_errors_per_sec: f64,
    pub rx_errors_per_sec: f64,
    pub timestamp: DateTime<Utc>,
}

impl InterfaceStats {
    pub fn to_history_point(&self) -> HistoryPoint {
        HistoryPoint {
            timestamp: self.timestamp,
            tx_bytes_per_sec: self.tx_bytes_per_sec,
            rx_bytes_per_sec: self.rx_bytes_per_sec,
            tx_packets_per_sec: self.tx_packets_per_sec,
            rx_packets_per_sec: self.rx_packets_per_sec,
            tx_errors: self.tx_errors_per_sec,
            rx_errors: self.rx_errors_per_sec,
        }
    }
}

/// Per-service traffic counters, summed over the service's virtual interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTraffic {
    pub router_id: String,
    pub instance_id: String,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes_per_sec: f64,
    pub rx_bytes_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub timestamp: DateTime<Utc>,
}

impl ServiceTraffic {
    pub fn to_history_point(&self) -> HistoryPoint {
        HistoryPoint {
            timestamp: self.timestamp,
            tx_bytes_per_sec: self.tx_bytes_per_sec,
            rx_bytes_per_sec: self.rx_bytes_per_sec,
            tx_packets_per_sec: self.tx_packets_per_sec,
            rx_packets_per_sec: self.rx_packets_per_sec,
            tx_errors: 0.0,
            rx_errors: 0.0,
        }
    }
}

/// One point of a historical series.
///
/// Every numeric field is a rate, so bucket averaging treats them
/// uniformly. Burst peaks are smoothed by downsampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub tx_bytes_per_sec: f64,
    pub rx_bytes_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_errors: f64,
    pub rx_errors: f64,
}

impl HistoryPoint {
    /// A point with every rate set to zero.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            tx_bytes_per_sec: 0.0,
            rx_bytes_per_sec: 0.0,
            tx_packets_per_sec: 0.0,
            rx_packets_per_sec: 0.0,
            tx_errors: 0.0,
            rx_errors: 0.0,
        }
    }
}
