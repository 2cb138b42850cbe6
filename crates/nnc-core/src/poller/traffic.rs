use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{PollSource, SessionMultiplexer};
use crate::config::PollingConfig;
use crate::events::{EventPublisher, MetricsEvent};
use crate::model::{ServiceKey, ServiceTraffic};
use crate::probe::{DeviceCommand, DeviceProbe, Record, counter, has_any};
use crate::telemetry::calculate_rate;

/// Comment prefix marking the virtual interfaces that belong to a service.
pub const SERVICE_COMMENT_PREFIX: &str = "nnc-svc:";

const TRAFFIC_KEYS: [&str; 4] = ["tx-byte", "rx-byte", "tx-packet", "rx-packet"];

/// Polls the summed counters of a service instance's virtual interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceTrafficSource;

pub type ServiceTrafficPoller = SessionMultiplexer<ServiceTrafficSource>;

impl ServiceTrafficPoller {
    pub fn for_services(
        probe: Arc<dyn DeviceProbe>,
        events: EventPublisher,
        polling: &PollingConfig,
    ) -> Self {
        Self::new(ServiceTrafficSource, probe, events, polling.traffic, polling)
    }
}

impl PollSource for ServiceTrafficSource {
    type Key = ServiceKey;
    type Point = ServiceTraffic;

    const NAME: &'static str = "service traffic poller";

    fn command(&self, key: &ServiceKey) -> DeviceCommand {
        DeviceCommand::print(&key.router_id, "/interface")
            .arg("?comment", format!("{SERVICE_COMMENT_PREFIX}{}", key.instance_id))
    }

    #[allow(clippy::cast_precision_loss)]
    fn build(
        &self,
        key: &ServiceKey,
        records: &[Record],
        previous: Option<&ServiceTraffic>,
        now: DateTime<Utc>,
    ) -> Option<ServiceTraffic> {
        let mut matched = false;
        let mut traffic = ServiceTraffic {
            router_id: key.router_id.clone(),
            instance_id: key.instance_id.clone(),
            tx_bytes: 0,
            rx_bytes: 0,
            tx_packets: 0,
            rx_packets: 0,
            tx_bytes_per_sec: 0.0,
            rx_bytes_per_sec: 0.0,
            tx_packets_per_sec: 0.0,
            rx_packets_per_sec: 0.0,
            timestamp: now,
        };

        for record in records.iter().filter(|r| has_any(r, &TRAFFIC_KEYS)) {
            matched = true;
            traffic.tx_bytes = traffic.tx_bytes.saturating_add(counter(record, "tx-byte"));
            traffic.rx_bytes = traffic.rx_bytes.saturating_add(counter(record, "rx-byte"));
            traffic.tx_packets = traffic.tx_packets.saturating_add(counter(record, "tx-packet"));
            traffic.rx_packets = traffic.rx_packets.saturating_add(counter(record, "rx-packet"));
        }
        if !matched {
            return None;
        }

        if let Some(prev) = previous {
            let elapsed = (now - prev.timestamp).num_milliseconds() as f64 / 1000.0;
            traffic.tx_bytes_per_sec = calculate_rate(traffic.tx_bytes, prev.tx_bytes, elapsed);
            traffic.rx_bytes_per_sec = calculate_rate(traffic.rx_bytes, prev.rx_bytes, elapsed);
            traffic.tx_packets_per_sec = calculate_rate(traffic.tx_packets, prev.tx_packets, elapsed);
            traffic.rx_packets_per_sec = calculate_rate(traffic.rx_packets, prev.rx_packets, elapsed);
        }

        Some(traffic)
    }

    fn event(&self, point: Arc<ServiceTraffic>) -> MetricsEvent {
        MetricsEvent::service_traffic(point)
    }
}
