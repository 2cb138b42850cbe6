//! End-to-end wiring of the monitoring facade.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use common::{RecordingSink, ScriptedProbe};
use nnc_core::{
    CoreError, HealthCheckConfig, HealthStatus, InterfaceKey, LinkKey, MetricsEvent, Monitoring,
    MonitoringConfig, TelemetryConfig, Tier,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

// ── Helpers ─────────────────────────────────────────────────────────

fn start(probe: &Arc<ScriptedProbe>, sink: &Arc<RecordingSink>, config: MonitoringConfig) -> Monitoring {
    Monitoring::builder()
        .probe(probe.clone())
        .sink(sink.clone())
        .config(config)
        .start()
        .unwrap()
}

// ── Construction ────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_capabilities_fail_construction() {
    let err = Monitoring::builder()
        .sink(RecordingSink::new())
        .start()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        CoreError::CapabilityUnavailable {
            capability: "device probe"
        }
    ));

    let err = Monitoring::builder()
        .probe(ScriptedProbe::new())
        .start()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        CoreError::CapabilityUnavailable {
            capability: "event sink"
        }
    ));
}

// ── Data flow ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_polled_stats_reach_sink_and_history() {
    let probe = ScriptedProbe::new();
    let sink = RecordingSink::new();
    let monitoring = start(&probe, &sink, MonitoringConfig::default());
    let scope = CancellationToken::new();
    let key = InterfaceKey::new("r1", "ether1");

    let mut feed = monitoring
        .subscribe_interface(key.clone(), Some(Duration::from_secs(1)), &scope)
        .unwrap();
    for _ in 0..3 {
        feed.recv().await.unwrap();
    }
    let info = monitoring.interface_session(&key).unwrap();
    assert_eq!(info.subscribers, 1);

    monitoring.shutdown().await;

    let stats_events = sink
        .events()
        .iter()
        .filter(|e| matches!(e, MetricsEvent::InterfaceStatsUpdated { .. }))
        .count();
    assert_eq!(stats_events, 3);

    let now = Utc::now();
    let history = monitoring
        .get_history("r1:ether1", now - TimeDelta::minutes(30), now, "1s")
        .unwrap();
    assert_eq!(history.tier, Tier::Hot);
    assert_eq!(history.points.len(), 3);
    assert!(
        history
            .points
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
}

#[tokio::test(start_paused = true)]
async fn test_health_flows_through_facade() {
    let probe = ScriptedProbe::new();
    let sink = RecordingSink::new();
    let monitoring = start(&probe, &sink, MonitoringConfig::default());
    let link = LinkKey::new("r1", "wan1");

    monitoring
        .configure_health_check(link.clone(), HealthCheckConfig::for_targets(["1.1.1.1"]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(monitoring.get_health_status(&link), HealthStatus::Healthy);

    monitoring.shutdown().await;
    assert!(
        sink.events()
            .iter()
            .any(|e| matches!(e, MetricsEvent::LinkHealthChanged { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_persists_cold_tier() {
    let dir = tempfile::tempdir().unwrap();
    let cold_path = dir.path().join("cold.json");
    let config = MonitoringConfig {
        telemetry: TelemetryConfig {
            cold_path: Some(cold_path.clone()),
            ..TelemetryConfig::default()
        },
        ..MonitoringConfig::default()
    };

    let probe = ScriptedProbe::new();
    let sink = RecordingSink::new();
    let monitoring = start(&probe, &sink, config);
    let scope = CancellationToken::new();
    let mut feed = monitoring
        .subscribe_interface(InterfaceKey::new("r1", "ether1"), None, &scope)
        .unwrap();
    feed.recv().await.unwrap();

    monitoring.shutdown().await;
    assert!(cold_path.exists());

    let raw = std::fs::read_to_string(&cold_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["series"]["r1:ether1"].is_object());
}
