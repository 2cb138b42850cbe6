// ── Outbound events ──
//
// Poll loops never call the event sink directly. They enqueue onto a
// bounded channel drained by a single forwarding task, so a slow sink
// can never stall a polling loop.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{HealthStatus, InterfaceStats, LinkKey, ServiceTraffic};

pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

// ── Event types ──────────────────────────────────────────────────────

/// A verdict transition for one WAN link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkHealthChange {
    pub link: LinkKey,
    pub previous: HealthStatus,
    pub current: HealthStatus,
    pub reachable: usize,
    pub total: usize,
    pub checked_at: DateTime<Utc>,
}

/// Everything the core publishes to the outside world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsEvent {
    InterfaceStatsUpdated {
        id: Uuid,
        stats: Arc<InterfaceStats>,
    },
    ServiceTrafficUpdated {
        id: Uuid,
        traffic: Arc<ServiceTraffic>,
    },
    LinkHealthChanged {
        id: Uuid,
        change: LinkHealthChange,
    },
}

impl MetricsEvent {
    pub fn interface_stats(stats: Arc<InterfaceStats>) -> Self {
        Self::InterfaceStatsUpdated {
            id: Uuid::new_v4(),
            stats,
        }
    }

    pub fn service_traffic(traffic: Arc<ServiceTraffic>) -> Self {
        Self::ServiceTrafficUpdated {
            id: Uuid::new_v4(),
            traffic,
        }
    }

    pub fn link_health(change: LinkHealthChange) -> Self {
        Self::LinkHealthChanged {
            id: Uuid::new_v4(),
            change,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::InterfaceStatsUpdated { id, .. }
            | Self::ServiceTrafficUpdated { id, .. }
            | Self::LinkHealthChanged { id, .. } => *id,
        }
    }

    /// Topic name used by downstream subscribers.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::InterfaceStatsUpdated { .. } => "interface.stats.updated",
            Self::ServiceTrafficUpdated { .. } => "service.traffic.updated",
            Self::LinkHealthChanged { .. } => "wan.health.changed",
        }
    }
}

// ── Sink capability ──────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("event sink error: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Best-effort destination for published events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &MetricsEvent) -> Result<(), SinkError>;
}

/// Forwards each event to every inner sink.
///
/// All sinks are attempted even when one fails; the last failure is
/// returned.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn publish(&self, event: &MetricsEvent) -> Result<(), SinkError> {
        let mut result = Ok(());
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                debug!(topic = event.topic(), error = %e, "fanout: sink rejected event");
                result = Err(e);
            }
        }
        result
    }
}

// ── Publisher ────────────────────────────────────────────────────────

/// Non-blocking handle for enqueueing events.
///
/// Cheaply cloneable. A full queue drops the event.
#[derive(Clone)]
pub struct EventPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    tx: mpsc::Sender<MetricsEvent>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventPublisher {
    /// Spawn the forwarding task. Must be called within a Tokio runtime.
    pub fn start(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(forward_task(sink, rx, cancel.clone()));

        Self {
            inner: Arc::new(PublisherInner {
                tx,
                cancel,
                handle: Mutex::new(Some(handle)),
            }),
        }
    }

    /// Enqueue an event. Returns `false` if it was dropped.
    pub fn publish(&self, event: MetricsEvent) -> bool {
        match self.inner.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(topic = event.topic(), "event queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(topic = event.topic(), "event publisher stopped, dropping event");
                false
            }
        }
    }

    /// Stop the forwarding task after it flushes already-queued events.
    ///
    /// Idempotent: later calls return immediately.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn forward_task(
    sink: Arc<dyn EventSink>,
    mut rx: mpsc::Receiver<MetricsEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => deliver(sink.as_ref(), &event).await,
                None => return,
            },
        }
    }

    rx.close();
    while let Ok(event) = rx.try_recv() {
        deliver(sink.as_ref(), &event).await;
    }
    debug!("event forwarder stopped");
}

async fn deliver(sink: &dyn EventSink, event: &MetricsEvent) {
    if let Err(e) = sink.publish(event).await {
        warn!(topic = event.topic(), event_id = %event.id(), error = %e, "event publish failed");
    }
}
