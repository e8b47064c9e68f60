//! Configuration loading and service endpoint resolution
//!
//! Settings are resolved with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Tiers 1 and 2 arrive together as [`ServiceOverrides`] (clap reads both);
//! this module merges them over the TOML file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default recognition/store service port
pub const DEFAULT_SERVICE_PORT: u16 = 8001;

/// Default service host name
pub const DEFAULT_SERVICE_HOST: &str = "localhost";

/// Default HTTP request timeout; recognition of a photo can take a while
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "OPLOG_CONFIG";

/// Contents of `oplog-intake.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[service]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Endpoint derived from this configuration
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(&self.host, self.port)
    }
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_SERVICE_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_SERVICE_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

/// Merge command-line/environment overrides over the TOML settings
///
/// A zero timeout would fail every request, so it is rejected.
pub fn resolve_service_config(
    overrides: &ServiceOverrides,
    toml: &TomlConfig,
) -> Result<ServiceConfig> {
    let mut resolved = toml.service.clone();

    if let Some(host) = overrides.host.as_ref().filter(|h| !h.trim().is_empty()) {
        debug!(host = %host, "Service host overridden");
        resolved.host = host.trim().to_string();
    }
    if let Some(port) = overrides.port {
        debug!(port, "Service port overridden");
        resolved.port = port;
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        resolved.timeout_secs = timeout_secs;
    }

    if resolved.timeout_secs == 0 {
        return Err(Error::Config(
            "service timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(resolved)
}

/// Address of the recognition/store service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    /// Create an endpoint, substituting loopback for `localhost`
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: resolve_service_host(host),
            port,
        }
    }

    /// Base URL with trailing slash, e.g. `http://127.0.0.1:8001/`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Map the conventional development host name onto the loopback address
pub fn resolve_service_host(host: &str) -> String {
    let host = host.trim();
    if host.eq_ignore_ascii_case("localhost") {
        "127.0.0.1".to_string()
    } else {
        host.to_string()
    }
}

/// Default config file location: `<config_dir>/oplog/oplog-intake.toml`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("oplog").join("oplog-intake.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Pick the config file: explicit path, then `OPLOG_CONFIG`, then default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load the TOML config; a missing file yields defaults
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write the TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}
