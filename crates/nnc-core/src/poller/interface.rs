use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{PollSource, SessionMultiplexer};
use crate::config::PollingConfig;
use crate::events::{EventPublisher, MetricsEvent};
use crate::model::{InterfaceKey, InterfaceStats};
use crate::probe::{DeviceCommand, DeviceProbe, Record, counter, has_any};
use crate::telemetry::calculate_rate;

/// Counter fields read from an interface record.
pub const INTERFACE_COUNTER_KEYS: [&str; 8] = [
    "tx-byte", "rx-byte", "tx-packet", "rx-packet", "tx-error", "rx-error", "tx-drop", "rx-drop",
];

/// Polls `/interface` counters for one interface per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceStatsSource;

pub type InterfaceStatsPoller = SessionMultiplexer<InterfaceStatsSource>;

impl InterfaceStatsPoller {
    pub fn for_interfaces(
        probe: Arc<dyn DeviceProbe>,
        events: EventPublisher,
        polling: &PollingConfig,
    ) -> Self {
        Self::new(InterfaceStatsSource, probe, events, polling.interface, polling)
    }
}

impl PollSource for InterfaceStatsSource {
    type Key = InterfaceKey;
    type Point = InterfaceStats;

    const NAME: &'static str = "interface stats poller";

    fn command(&self, key: &InterfaceKey) -> DeviceCommand {
        DeviceCommand::print(&key.router_id, "/interface").arg(".id", &key.interface_id)
    }

    #[allow(clippy::cast_precision_loss)]
    fn build(
        &self,
        key: &InterfaceKey,
        records: &[Record],
        previous: Option<&InterfaceStats>,
        now: DateTime<Utc>,
    ) -> Option<InterfaceStats> {
        let record = records.iter().find(|r| has_any(r, &INTERFACE_COUNTER_KEYS))?;

        let mut stats = InterfaceStats {
            router_id: key.router_id.clone(),
            interface_id: key.interface_id.clone(),
            tx_bytes: counter(record, "tx-byte"),
            rx_bytes: counter(record, "rx-byte"),
            tx_packets: counter(record, "tx-packet"),
            rx_packets: counter(record, "rx-packet"),
            tx_errors: counter(record, "tx-error"),
            rx_errors: counter(record, "rx-error"),
            tx_drops: counter(record, "tx-drop"),
            rx_drops: counter(record, "rx-drop"),
            tx_bytes_per_sec: 0.0,
            rx_bytes_per_sec: 0.0,
            tx_packets_per_sec: 0.0,
            rx_packets_per_sec: 0.0,
            tx_errors_per_sec: 0.0,
            rx_errors_per_sec: 0.0,
            timestamp: now,
        };

        if let Some(prev) = previous {
            let elapsed = (now - prev.timestamp).num_milliseconds() as f64 / 1000.0;
            stats.tx_bytes_per_sec = calculate_rate(stats.tx_bytes, prev.tx_bytes, elapsed);
            stats.rx_bytes_per_sec = calculate_rate(stats.rx_bytes, prev.rx_bytes, elapsed);
            stats.tx_packets_per_sec = calculate_rate(stats.tx_packets, prev.tx_packets, elapsed);
            stats.rx_packets_per_sec = calculate_rate(stats.rx_packets, prev.rx_packets, elapsed);
            stats.tx_errors_per_sec = calculate_rate(stats.tx_errors, prev.tx_errors, elapsed);
            stats.rx_errors_per_sec = calculate_rate(stats.rx_errors, prev.rx_errors, elapsed);
        }

        Some(stats)
    }

    fn event(&self, point: Arc<InterfaceStats>) -> MetricsEvent {
        MetricsEvent::interface_stats(point)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn command_targets_one_interface() {
        let cmd = InterfaceStatsSource.command(&InterfaceKey::new("r1", "ether1"));
        assert_eq!(cmd.path, "/interface");
        assert_eq!(cmd.arg_value(".id"), Some("ether1"));
        assert_eq!(cmd.router_id, "r1");
    }

    #[test]
    fn first_sample_has_zero_rates() {
        let key = InterfaceKey::new("r1", "ether1");
        let stats = InterfaceStatsSource
            .build(&key, &[record(&[("tx-byte", "1000"), ("rx-byte", "2000")])], None, Utc::now())
            .unwrap();
        assert_eq!(stats.tx_bytes, 1000);
        assert_eq!(stats.tx_drops, 0);
        assert!(stats.tx_bytes_per_sec.abs() < f64::EPSILON);
    }

    #[test]
    fn rates_follow_previous_sample() {
        let key = InterfaceKey::new("r1", "ether1");
        let t0 = Utc::now();
        let first = InterfaceStatsSource
            .build(&key, &[record(&[("tx-byte", "500"), ("rx-byte", "9000")])], None, t0)
            .unwrap();
        let second = InterfaceStatsSource
            .build(
                &key,
                &[record(&[("tx-byte", "1000"), ("rx-byte", "100")])],
                Some(&first),
                t0 + TimeDelta::seconds(5),
            )
            .unwrap();

        assert!((second.tx_bytes_per_sec - 100.0).abs() < f64::EPSILON);
        // counter reset
        assert!(second.rx_bytes_per_sec.abs() < f64::EPSILON);
    }

    #[test]
    fn records_without_counters_are_rejected() {
        let key = InterfaceKey::new("r1", "ether1");
        let built = InterfaceStatsSource.build(&key, &[record(&[("name", "ether1")])], None, Utc::now());
        assert!(built.is_none());
    }
}
