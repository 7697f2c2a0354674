//! Bootstrap configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment values arrive together as [`ConfigOverrides`]
//! (clap reads both); this module merges them with the TOML layer and the
//! compiled defaults into a [`ServerConfig`].

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "HCM_CONFIG";

/// Upload size ceiling (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Admin session lifetime (4 hours)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 4 * 60 * 60;

/// Contents of the optional TOML config file
///
/// Every field is optional; anything missing falls through to the compiled default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub asset_url_prefix: Option<String>,
    pub max_upload_bytes: Option<u64>,
    pub db_max_connections: Option<u32>,
    pub admin_user: Option<String>,
    pub admin_pass: Option<String>,
    pub session_ttl_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (e.g. "info", "hcm_cms=debug")
    pub level: Option<String>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub admin_user: Option<String>,
    pub admin_pass: Option<String>,
}

/// Compiled fallbacks for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_root = dirs::data_local_dir()
            .map(|d| d.join("hcm"))
            .unwrap_or_else(|| PathBuf::from("./hcm_data"));

        Self {
            data_root,
            host: "127.0.0.1".to_string(),
            port: 2026,
            log_level: "hcm_cms=info,tower_http=info".to_string(),
        }
    }
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub asset_root: PathBuf,
    pub asset_url_prefix: String,
    pub max_upload_bytes: u64,
    pub db_max_connections: u32,
    pub admin_user: String,
    pub admin_pass: String,
    pub session_ttl_secs: u64,
    pub log_level: String,
}

impl ServerConfig {
    /// Merge the three configuration layers
    pub fn resolve(
        overrides: &ConfigOverrides,
        toml: &TomlConfig,
        defaults: &CompiledDefaults,
    ) -> Self {
        let database_path = overrides
            .database_path
            .clone()
            .or_else(|| toml.database_path.clone())
            .unwrap_or_else(|| defaults.data_root.join("hcm_ebook.db"));

        let asset_root = overrides
            .asset_root
            .clone()
            .or_else(|| toml.asset_root.clone())
            .unwrap_or_else(|| defaults.data_root.join("public").join("uploads"));

        let asset_url_prefix = toml
            .asset_url_prefix
            .clone()
            .map(|p| normalize_url_prefix(&p))
            .unwrap_or_else(|| "/public/uploads".to_string());

        Self {
            host: overrides
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or_else(|| defaults.host.clone()),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            database_path,
            asset_root,
            asset_url_prefix,
            max_upload_bytes: toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            db_max_connections: toml.db_max_connections.unwrap_or(10).max(1),
            admin_user: overrides
                .admin_user
                .clone()
                .or_else(|| toml.admin_user.clone())
                .unwrap_or_else(|| "admin".to_string()),
            admin_pass: overrides
                .admin_pass
                .clone()
                .or_else(|| toml.admin_pass.clone())
                .unwrap_or_else(|| "admin".to_string()),
            session_ttl_secs: toml.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
            log_level: toml
                .logging
                .level
                .clone()
                .unwrap_or_else(|| defaults.log_level.clone()),
        }
    }
}

/// Pick the TOML file to read: explicit path, then `HCM_CONFIG`, then the
/// per-user config directory.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("hcm").join("config.toml"))
}

/// Load the TOML layer
///
/// A missing file is not an error: a warning is logged and defaults apply.
/// A file that exists but does not parse is a `Config` error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config file {}", path.display());
    Ok(config)
}

fn normalize_url_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_prefix_normalization() {
        assert_eq!(normalize_url_prefix("public/uploads/"), "/public/uploads");
        assert_eq!(normalize_url_prefix("/media"), "/media");
    }
}
