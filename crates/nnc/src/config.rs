//! CLI-side configuration resolution.
//!
//! Thin layer over `nnc-config`: honors `--config` and fills in the
//! platform default cold snapshot path.

use std::path::PathBuf;

use nnc_config::Config;
use nnc_core::MonitoringConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` / `NNC_CONFIG_FILE`, else the platform path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(nnc_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(nnc_config::load_config_from(&config_file(global))?)
}

/// Core runtime config with the cold tier always backed by a file.
pub fn monitoring_config(cfg: &Config) -> MonitoringConfig {
    let mut monitoring = cfg.to_monitoring_config();
    monitoring.telemetry.cold_path = Some(cfg.cold_path_or_default());
    monitoring
}
