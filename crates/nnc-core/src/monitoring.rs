// ── Monitoring facade ──
//
// Owns every long-lived component of the subsystem and the order in
// which they stop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::MonitoringConfig;
use crate::error::CoreError;
use crate::events::{EventPublisher, EventSink, FanoutSink};
use crate::health::HealthMonitor;
use crate::model::{HealthCheckConfig, HealthStatus, InterfaceKey, LinkKey, ServiceKey};
use crate::poller::{
    InterfaceFeed, InterfaceStatsPoller, ServiceTrafficFeed, ServiceTrafficPoller, SessionInfo,
};
use crate::probe::DeviceProbe;
use crate::telemetry::{StatsHistory, TelemetryStore};

/// Builder for [`Monitoring`]. Both capabilities are required.
#[derive(Default)]
pub struct MonitoringBuilder {
    probe: Option<Arc<dyn DeviceProbe>>,
    sink: Option<Arc<dyn EventSink>>,
    config: MonitoringConfig,
}

impl MonitoringBuilder {
    pub fn probe(mut self, probe: Arc<dyn DeviceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: MonitoringConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire everything together and spawn the background tasks.
    /// Must be called within a Tokio runtime.
    pub fn start(self) -> Result<Monitoring, CoreError> {
        let probe = self.probe.ok_or(CoreError::CapabilityUnavailable {
            capability: "device probe",
        })?;
        let sink = self.sink.ok_or(CoreError::CapabilityUnavailable {
            capability: "event sink",
        })?;
        let config = self.config;

        let telemetry = Arc::new(TelemetryStore::open(config.telemetry.clone())?);
        let fanout = FanoutSink::new(vec![sink, Arc::clone(&telemetry) as Arc<dyn EventSink>]);
        let publisher = EventPublisher::start(Arc::new(fanout), config.event_queue_capacity);

        let interfaces =
            InterfaceStatsPoller::for_interfaces(Arc::clone(&probe), publisher.clone(), &config.polling);
        let services =
            ServiceTrafficPoller::for_services(Arc::clone(&probe), publisher.clone(), &config.polling);
        let health = HealthMonitor::new(probe, publisher.clone(), &config.health);

        let maintenance_cancel = CancellationToken::new();
        let maintenance = telemetry.spawn_maintenance(maintenance_cancel.clone());

        debug!("monitoring started");
        Ok(Monitoring {
            inner: Arc::new(MonitoringInner {
                interfaces,
                services,
                health,
                telemetry,
                publisher,
                maintenance_cancel,
                maintenance: Mutex::new(Some(maintenance)),
            }),
        })
    }
}

/// Cloneable handle to the running subsystem.
#[derive(Clone)]
pub struct Monitoring {
    inner: Arc<MonitoringInner>,
}

struct MonitoringInner {
    interfaces: InterfaceStatsPoller,
    services: ServiceTrafficPoller,
    health: HealthMonitor,
    telemetry: Arc<TelemetryStore>,
    publisher: EventPublisher,
    maintenance_cancel: CancellationToken,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl Monitoring {
    pub fn builder() -> MonitoringBuilder {
        MonitoringBuilder::default()
    }

    // ── Component access ─────────────────────────────────────────────

    pub fn interfaces(&self) -> &InterfaceStatsPoller {
        &self.inner.interfaces
    }

    pub fn services(&self) -> &ServiceTrafficPoller {
        &self.inner.services
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.inner.health
    }

    pub fn telemetry(&self) -> &Arc<TelemetryStore> {
        &self.inner.telemetry
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.inner.publisher
    }

    // ── Subscribe / query surface ────────────────────────────────────

    pub fn subscribe_interface(
        &self,
        key: InterfaceKey,
        interval: Option<Duration>,
        scope: &CancellationToken,
    ) -> Result<InterfaceFeed, CoreError> {
        self.inner.interfaces.subscribe(key, interval, scope)
    }

    pub fn subscribe_traffic(
        &self,
        key: ServiceKey,
        interval: Option<Duration>,
        scope: &CancellationToken,
    ) -> Result<ServiceTrafficFeed, CoreError> {
        self.inner.services.subscribe(key, interval, scope)
    }

    pub fn interface_session(&self, key: &InterfaceKey) -> Option<SessionInfo> {
        self.inner.interfaces.session_info(key)
    }

    pub fn traffic_session(&self, key: &ServiceKey) -> Option<SessionInfo> {
        self.inner.services.session_info(key)
    }

    pub async fn configure_health_check(
        &self,
        link: LinkKey,
        config: HealthCheckConfig,
    ) -> Result<(), CoreError> {
        self.inner.health.configure_health_check(link, config).await
    }

    pub fn get_health_status(&self, link: &LinkKey) -> HealthStatus {
        self.inner.health.get_health_status(link)
    }

    pub fn get_history(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<StatsHistory, CoreError> {
        self.inner.telemetry.get_history(resource_id, start, end, interval)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop pollers and health loops, flush the publisher, then stop
    /// maintenance so the final cold persist sees every queued update.
    pub async fn shutdown(&self) {
        self.inner.interfaces.stop().await;
        self.inner.services.stop().await;
        self.inner.health.shutdown().await;

        self.inner.publisher.shutdown().await;

        self.inner.maintenance_cancel.cancel();
        let maintenance = self.inner.maintenance.lock().take();
        if let Some(handle) = maintenance {
            if let Err(e) = handle.await {
                warn!(error = %e, "telemetry maintenance task failed");
            }
        }
        debug!("monitoring stopped");
    }
}
