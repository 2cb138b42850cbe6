//! Live stream handlers: interface stats and service traffic.

use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use nnc_config::Config;
use nnc_core::{InterfaceKey, InterfaceStats, Monitoring, ServiceKey, ServiceTraffic};

use crate::cli::{GlobalOpts, StreamOpts, WatchArgs, WatchCommand};
use crate::error::CliError;
use crate::output::{StreamPrinter, fmt_pps, fmt_rate};
use crate::sim::SimulatedRouter;

use super::util::{self, CliSink};

pub async fn handle(args: WatchArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let sink = Arc::new(CliSink::default());
    let monitoring = util::start_monitoring(cfg, SimulatedRouter::new(), sink)?;
    let scope = util::interrupt_scope();

    let result = match args.command {
        WatchCommand::Interface(args) => {
            let key = InterfaceKey::new(args.router, args.interface);
            watch_interface(&monitoring, key, &args.stream, &scope, global).await
        }
        WatchCommand::Traffic(args) => {
            let key = ServiceKey::new(args.router, args.instance);
            watch_traffic(&monitoring, key, &args.stream, &scope, global).await
        }
    };

    scope.cancel();
    monitoring.shutdown().await;
    result
}

// ── Interface stats ──────────────────────────────────────────────────

async fn watch_interface(
    monitoring: &Monitoring,
    key: InterfaceKey,
    opts: &StreamOpts,
    scope: &CancellationToken,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let feed = monitoring.subscribe_interface(key.clone(), opts.interval, scope)?;
    if let Some(session) = monitoring.interface_session(&key) {
        info!(%key, interval = ?session.interval, "watching interface");
    }

    let header = format!(
        "{:<10} {:>12} {:>12} {:>12} {:>12} {:>8}",
        "TIME", "TX", "RX", "TX PKT", "RX PKT", "ERR/S"
    );
    let printer = StreamPrinter::new(global.output, global.quiet, header);
    pump(feed, opts.count, scope, printer, |printer, stats: &InterfaceStats| {
        printer.emit(stats, interface_row, |s| {
            format!(
                "{} {} {} {:.3} {:.3}",
                s.timestamp.to_rfc3339(),
                s.tx_bytes,
                s.rx_bytes,
                s.tx_bytes_per_sec,
                s.rx_bytes_per_sec
            )
        })
    })
    .await
}

fn interface_row(s: &InterfaceStats) -> String {
    format!(
        "{:<10} {:>12} {:>12} {:>12} {:>12} {:>8.1}",
        s.timestamp.format("%H:%M:%S").to_string(),
        fmt_rate(s.tx_bytes_per_sec),
        fmt_rate(s.rx_bytes_per_sec),
        fmt_pps(s.tx_packets_per_sec),
        fmt_pps(s.rx_packets_per_sec),
        s.tx_errors_per_sec + s.rx_errors_per_sec,
    )
}

// ── Service traffic ──────────────────────────────────────────────────

async fn watch_traffic(
    monitoring: &Monitoring,
    key: ServiceKey,
    opts: &StreamOpts,
    scope: &CancellationToken,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let feed = monitoring.subscribe_traffic(key.clone(), opts.interval, scope)?;
    if let Some(session) = monitoring.traffic_session(&key) {
        info!(%key, interval = ?session.interval, "watching service traffic");
    }

    let header = format!(
        "{:<10} {:>12} {:>12} {:>14} {:>14}",
        "TIME", "TX", "RX", "TX TOTAL", "RX TOTAL"
    );
    let printer = StreamPrinter::new(global.output, global.quiet, header);
    pump(feed, opts.count, scope, printer, |printer, t: &ServiceTraffic| {
        printer.emit(t, traffic_row, |t| {
            format!(
                "{} {} {} {:.3} {:.3}",
                t.timestamp.to_rfc3339(),
                t.tx_bytes,
                t.rx_bytes,
                t.tx_bytes_per_sec,
                t.rx_bytes_per_sec
            )
        })
    })
    .await
}

fn traffic_row(t: &ServiceTraffic) -> String {
    format!(
        "{:<10} {:>12} {:>12} {:>14} {:>14}",
        t.timestamp.format("%H:%M:%S").to_string(),
        fmt_rate(t.tx_bytes_per_sec),
        fmt_rate(t.rx_bytes_per_sec),
        t.tx_bytes,
        t.rx_bytes,
    )
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Print feed items until `count` is reached, the feed closes, or the
/// scope is cancelled.
async fn pump<F, P>(
    mut feed: F,
    count: Option<u64>,
    scope: &CancellationToken,
    mut printer: StreamPrinter,
    mut print: impl FnMut(&mut StreamPrinter, &P) -> Result<(), CliError>,
) -> Result<(), CliError>
where
    F: Stream<Item = Arc<P>> + Unpin,
{
    let mut seen = 0_u64;
    loop {
        let next = tokio::select! {
            biased;
            () = scope.cancelled() => None,
            item = feed.next() => item,
        };
        let Some(item) = next else {
            break;
        };
        print(&mut printer, item.as_ref())?;
        seen += 1;
        if count.is_some_and(|n| seen >= n) {
            break;
        }
    }
    Ok(())
}
