//! Output formatting: table, JSON, plain.
//!
//! Snapshot views (history, health, config) render once through
//! [`render_list`] / [`render_single`]. Live streams print one line per
//! update through [`StreamPrinter`], since a table can't grow in place.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use nnc_core::HealthStatus;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

pub fn paint_status(status: HealthStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        HealthStatus::Healthy => text.green().bold().to_string(),
        HealthStatus::Degraded => text.yellow().bold().to_string(),
        HealthStatus::Down => text.red().bold().to_string(),
        HealthStatus::Unknown => text.dimmed().to_string(),
    }
}

// ── Unit formatting ──────────────────────────────────────────────────

/// Human-readable byte rate, e.g. `1.50 MB/s`.
pub fn fmt_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "kB/s", "MB/s", "GB/s"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

pub fn fmt_pps(packets_per_sec: f64) -> String {
    format!("{:.1} p/s", packets_per_sec.max(0.0))
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(plain_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single item. Table mode uses `detail_fn` for a key/value view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => plain_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Streaming ────────────────────────────────────────────────────────

/// Line-oriented printer for live feeds.
///
/// Table mode prints a header once, then one aligned row per update.
/// JSON modes emit one compact document per line.
pub struct StreamPrinter {
    format: OutputFormat,
    quiet: bool,
    header: Option<String>,
}

impl StreamPrinter {
    pub fn new(format: OutputFormat, quiet: bool, header: String) -> Self {
        Self {
            format,
            quiet,
            header: Some(header),
        }
    }

    pub fn emit<T: Serialize>(
        &mut self,
        item: &T,
        row: impl FnOnce(&T) -> String,
        plain: impl FnOnce(&T) -> String,
    ) -> Result<(), CliError> {
        let line = match self.format {
            OutputFormat::Table => {
                if let Some(header) = self.header.take() {
                    print_output(&header, self.quiet);
                }
                row(item)
            }
            OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(item)?,
            OutputFormat::Plain => plain(item),
        };
        print_output(&line, self.quiet);
        Ok(())
    }
}
