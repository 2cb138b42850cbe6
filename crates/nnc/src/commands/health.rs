//! WAN health check handler.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use nnc_config::Config;
use nnc_core::{HealthCheckConfig, HealthStatus, LinkHealthChange, LinkKey, Monitoring};

use crate::cli::{GlobalOpts, HealthArgs};
use crate::error::CliError;
use crate::output::{self, StreamPrinter, paint_status, should_color};
use crate::sim::SimulatedRouter;

use super::util::{self, CliSink};

#[derive(Debug, Serialize)]
struct HealthReport {
    router_id: String,
    wan_id: String,
    status: HealthStatus,
    targets: Vec<String>,
    checked_at: DateTime<Utc>,
}

pub async fn handle(args: HealthArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let router = SimulatedRouter::with_down_hosts(args.simulate_down);
    let (tx, mut changes) = mpsc::unbounded_channel();
    let sink = Arc::new(CliSink::forwarding_health(tx));
    let monitoring = util::start_monitoring(cfg, router, sink)?;

    let link = LinkKey::new(args.router, args.wan);
    let check = cfg.health_check(args.targets);
    let result = run(&monitoring, &link, check, args.watch_for, &mut changes, global).await;

    // Leave no probes behind on the router.
    if let Err(e) = monitoring
        .configure_health_check(link.clone(), HealthCheckConfig::default())
        .await
    {
        warn!(%link, error = %e, "failed to remove health probes");
    }
    monitoring.shutdown().await;
    result
}

async fn run(
    monitoring: &Monitoring,
    link: &LinkKey,
    check: HealthCheckConfig,
    watch_for: Option<Duration>,
    changes: &mut mpsc::UnboundedReceiver<LinkHealthChange>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let targets = check.targets.clone();
    monitoring.configure_health_check(link.clone(), check).await?;
    let status = monitoring.health().check_now(link).await?;

    let color = should_color(global.color);
    let report = HealthReport {
        router_id: link.router_id.clone(),
        wan_id: link.wan_id.clone(),
        status,
        targets,
        checked_at: Utc::now(),
    };
    let rendered = output::render_single(
        global.output,
        &report,
        |r| {
            format!(
                "Link:     {}:{}\nStatus:   {}\nTargets:  {}",
                r.router_id,
                r.wan_id,
                paint_status(r.status, color),
                r.targets.join(", ")
            )
        },
        |r| r.status.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);

    let Some(window) = watch_for else {
        return Ok(());
    };

    let scope = util::interrupt_scope();
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    let mut printer = StreamPrinter::new(global.output, global.quiet, String::new());
    let mut last = status;

    loop {
        let change = tokio::select! {
            biased;
            () = scope.cancelled() => break,
            () = &mut deadline => break,
            change = changes.recv() => change,
        };
        let Some(change) = change else {
            break;
        };
        // The verdict already reported above arrives here too.
        if change.link != *link || change.current == last {
            continue;
        }
        last = change.current;
        printer.emit(
            &change,
            |c| {
                format!(
                    "{} {} {} -> {} ({}/{} reachable)",
                    c.checked_at.format("%H:%M:%S"),
                    c.link,
                    paint_status(c.previous, color),
                    paint_status(c.current, color),
                    c.reachable,
                    c.total
                )
            },
            |c| format!("{} {}", c.checked_at.to_rfc3339(), c.current),
        )?;
    }

    scope.cancel();
    Ok(())
}
