//! Configuration resolution for oplog-intake
//!
//! Provides multi-tier configuration resolution with CLI → ENV → TOML priority.

use oplog_common::config::{
    load_toml_config, resolve_config_path, resolve_service_config, LoggingConfig, ServiceConfig,
    ServiceOverrides,
};
use crate::error::IntakeResult;
use std::path::{Path, PathBuf};

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    /// Config file consulted (it may not exist)
    pub config_path: PathBuf,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// Resolve settings from the config file and command-line/env overrides
///
/// Runs before logging is set up, so it does not log; callers report the
/// outcome once tracing is initialized.
pub fn load_settings(
    cli_config: Option<&Path>,
    overrides: &ServiceOverrides,
) -> IntakeResult<IntakeSettings> {
    let config_path = resolve_config_path(cli_config)?;
    let toml = load_toml_config(&config_path)?;
    let service = resolve_service_config(overrides, &toml)?;

    Ok(IntakeSettings {
        config_path,
        service,
        logging: toml.logging,
    })
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter(logging: &LoggingConfig) -> String {
    let level = match logging.level.trim().to_ascii_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("oplog_intake={level},oplog_common={level}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeError;
    use oplog_common::config::{write_toml_config, TomlConfig};
    use tempfile::TempDir;

    #[test]
    fn test_log_filter_levels() {
        let debug = LoggingConfig {
            level: "DEBUG".to_string(),
        };
        assert_eq!(
            default_log_filter(&debug),
            "oplog_intake=debug,oplog_common=debug"
        );

        let bogus = LoggingConfig {
            level: "loud".to_string(),
        };
        assert_eq!(
            default_log_filter(&bogus),
            "oplog_intake=info,oplog_common=info"
        );
    }

    #[test]
    fn test_load_settings_merges_file_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("oplog-intake.toml");
        let mut file_config = TomlConfig::default();
        file_config.service.host = "scanner.lan".to_string();
        file_config.service.port = 8100;
        write_toml_config(&file_config, &path).unwrap();

        let overrides = ServiceOverrides {
            port: Some(8200),
            ..Default::default()
        };
        let settings = load_settings(Some(path.as_path()), &overrides).unwrap();

        assert_eq!(settings.config_path, path);
        assert_eq!(settings.service.host, "scanner.lan");
        assert_eq!(settings.service.port, 8200);
        assert_eq!(settings.service.endpoint().base_url(), "http://scanner.lan:8200/");
    }

    #[test]
    fn test_load_settings_wraps_config_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("oplog-intake.toml");
        std::fs::write(&path, "[service]\ntimeout_secs = 0\n").unwrap();

        let err = load_settings(Some(path.as_path()), &ServiceOverrides::default()).unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Common(oplog_common::Error::Config(msg)) if msg.contains("timeout_secs")
        ));
    }
}
