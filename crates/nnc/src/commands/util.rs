//! Shared helpers for command handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nnc_config::Config;
use nnc_core::{DeviceProbe, EventSink, LinkHealthChange, MetricsEvent, Monitoring, SinkError};

use crate::config;
use crate::error::CliError;

// ── Event sink ───────────────────────────────────────────────────────

/// Outbound sink for CLI sessions: logs every event and optionally
/// forwards link health transitions to the running command.
#[derive(Default)]
pub struct CliSink {
    health: Option<mpsc::UnboundedSender<LinkHealthChange>>,
}

impl CliSink {
    pub fn forwarding_health(tx: mpsc::UnboundedSender<LinkHealthChange>) -> Self {
        Self { health: Some(tx) }
    }
}

#[async_trait]
impl EventSink for CliSink {
    async fn publish(&self, event: &MetricsEvent) -> Result<(), SinkError> {
        debug!(topic = event.topic(), id = %event.id(), "event published");
        if let (Some(tx), MetricsEvent::LinkHealthChanged { change, .. }) = (&self.health, event) {
            tx.send(change.clone())
                .map_err(|_| SinkError::new("health listener is gone"))?;
        }
        Ok(())
    }
}

// ── Lifecycle ────────────────────────────────────────────────────────

pub fn start_monitoring(
    cfg: &Config,
    probe: Arc<dyn DeviceProbe>,
    sink: Arc<dyn EventSink>,
) -> Result<Monitoring, CliError> {
    let monitoring = Monitoring::builder()
        .probe(probe)
        .sink(sink)
        .config(config::monitoring_config(cfg))
        .start()?;
    Ok(monitoring)
}

/// A token cancelled on Ctrl-C. Cancelling it also stops the listener.
pub fn interrupt_scope() -> CancellationToken {
    let token = CancellationToken::new();
    let listener = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = listener.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    debug!("interrupted");
                    listener.cancel();
                }
            }
        }
    });
    token
}
