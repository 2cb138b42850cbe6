mod cli;
mod commands;
mod config;
mod error;
mod output;
mod sim;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nnc_config::{LogFormat, LoggingSection};

use crate::cli::{Cli, GlobalOpts, LogFormatArg};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config is loaded up front so it can shape logging; commands that
    // don't need it still run when it fails to load.
    let loaded = config::load(&cli.global);
    init_tracing(&cli.global, loaded.as_ref().ok().map(|c| &c.logging));

    if let Err(err) = run(cli, loaded).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts, logging: Option<&LoggingSection>) {
    let configured = logging.map_or("warn", |l| l.level.as_str());
    let filter = match global.verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let json = match global.log_format {
        Some(LogFormatArg::Json) => true,
        Some(LogFormatArg::Text) => false,
        None => logging.is_some_and(|l| l.format == LogFormat::Json),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, loaded: Result<nnc_config::Config, CliError>) -> Result<(), CliError> {
    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, loaded, &cli.global).await
}
