//! Traffic history handler, served from the persisted cold tier.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tabled::Tabled;

use nnc_config::Config;
use nnc_core::{HistoryPoint, StatsHistory, TelemetryStore, Tier};

use crate::cli::{GlobalOpts, HistoryArgs, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output::{self, fmt_pps, fmt_rate};

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "TX")]
    tx: String,
    #[tabled(rename = "RX")]
    rx: String,
    #[tabled(rename = "TX pkt")]
    tx_packets: String,
    #[tabled(rename = "RX pkt")]
    rx_packets: String,
    #[tabled(rename = "Errors/s")]
    errors: String,
}

fn history_row(p: &HistoryPoint) -> HistoryRow {
    HistoryRow {
        time: p.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        tx: fmt_rate(p.tx_bytes_per_sec),
        rx: fmt_rate(p.rx_bytes_per_sec),
        tx_packets: fmt_pps(p.tx_packets_per_sec),
        rx_packets: fmt_pps(p.rx_packets_per_sec),
        errors: format!("{:.2}", p.tx_errors + p.rx_errors),
    }
}

/// `now - value`, rejecting offsets outside the representable range.
fn ago(now: DateTime<Utc>, value: Duration, flag: &str) -> Result<DateTime<Utc>, CliError> {
    TimeDelta::from_std(value)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| CliError::Validation {
            field: flag.into(),
            reason: format!("{} is out of range", humantime::format_duration(value)),
        })
}

pub fn handle(args: &HistoryArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let store = TelemetryStore::open(config::monitoring_config(cfg).telemetry)?;

    let now = Utc::now();
    let start = ago(now, args.since, "--since")?;
    let end = ago(now, args.until.unwrap_or_default(), "--until")?;
    let history = store.query_tier(Tier::Cold, &args.resource, start, end, &args.interval)?;

    let rendered = match global.output {
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            global.output,
            &history.points,
            history_row,
            |p| {
                format!(
                    "{} {:.3} {:.3}",
                    p.timestamp.to_rfc3339(),
                    p.tx_bytes_per_sec,
                    p.rx_bytes_per_sec
                )
            },
        )?,
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(global.output, &history, summary, |_| String::new())?
        }
    };

    if history.points.is_empty() && global.output == OutputFormat::Table {
        eprintln!("{}", summary(&history));
        return Ok(());
    }
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn summary(history: &StatsHistory) -> String {
    format!(
        "{} points for {} from the {} tier ({} buckets)",
        history.points.len(),
        history.resource_id,
        history.tier,
        humantime::format_duration(history.interval)
    )
}
