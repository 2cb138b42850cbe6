//! Loading configuration from TOML files and `NNC_*` environment variables.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use figment::Jail;
use nnc_config::{Config, ConfigError, LogFormat, load_config_from, save_config_to};
use pretty_assertions::assert_eq;

fn to_jail_err(err: ConfigError) -> figment::Error {
    figment::Error::from(err.to_string())
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load_config_from(Path::new("does-not-exist.toml")).map_err(to_jail_err)?;
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn test_file_values_override_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                [polling.interface]
                min_secs = 2
                default_secs = 4
                max_secs = 20

                [telemetry]
                max_points = 200
                cold_path = "/var/lib/nnc/cold.json"

                [logging]
                format = "json"
            "#,
        )?;

        let config = load_config_from(Path::new("config.toml")).map_err(to_jail_err)?;
        assert_eq!(config.polling.interface.default_secs, 4);
        // untouched sections keep their defaults
        assert_eq!(config.polling.traffic.max_secs, 60);
        assert_eq!(config.telemetry.max_points, 200);
        assert_eq!(config.telemetry.hot_capacity, 3600);
        assert_eq!(config.logging.format, LogFormat::Json);

        let core = config.to_monitoring_config();
        assert_eq!(core.polling.interface.max.as_secs(), 20);
        assert_eq!(
            core.telemetry.cold_path.as_deref(),
            Some(Path::new("/var/lib/nnc/cold.json"))
        );
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[telemetry]\nmax_points = 200\n")?;
        jail.set_env("NNC_TELEMETRY__MAX_POINTS", "42");
        jail.set_env("NNC_HEALTH__POLL_INTERVAL_SECS", "3");

        let config = load_config_from(Path::new("config.toml")).map_err(to_jail_err)?;
        assert_eq!(config.telemetry.max_points, 42);
        assert_eq!(config.health.poll_interval_secs, 3);
        Ok(())
    });
}

#[test]
fn test_invalid_values_fail_validation() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            "[polling.traffic]\nmin_secs = 30\ndefault_secs = 10\nmax_secs = 60\n",
        )?;

        let err = load_config_from(Path::new("config.toml")).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "polling.traffic"),
            "{err}"
        );
        Ok(())
    });
}

#[test]
fn test_save_then_load_preserves_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.events.queue_capacity = 64;
    config.logging.level = "nnc_core=debug".into();
    save_config_to(&path, &config).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("[events]"));
    assert!(!raw.contains("cold_path"));

    let loaded: Config = toml::from_str(&raw).unwrap();
    assert_eq!(loaded, config);
}
