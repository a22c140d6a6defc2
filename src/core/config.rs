//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.portico/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//! Endpoint paths are configuration, not contract: deployments may move
//! them without a client release.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PorticoConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub login: Option<String>,
    pub register: Option<String>,
    pub logout: Option<String>,
    pub refresh: Option<String>,
    pub current_user: Option<String>,
    pub change_password: Option<String>,
    pub forgot_password: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_CURRENT_USER_PATH: &str = "/auth/me";
pub const DEFAULT_CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
pub const DEFAULT_FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub endpoints: Endpoints,
}

/// Concrete endpoint paths, all leading-slash relative to the base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub logout: String,
    pub refresh: String,
    pub current_user: String,
    pub change_password: String,
    pub forgot_password: String,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.portico/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".portico").join("config.toml"))
}

/// Load config from `~/.portico/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PorticoConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PorticoConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(PorticoConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(PorticoConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: PorticoConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Portico Configuration
# All settings are optional - defaults are used for anything not specified.
# Override hierarchy: defaults -> this file -> env vars -> CLI flags.

# [api]
# base_url = "http://localhost:3000/api"   # Or set PORTICO_BASE_URL env var
# timeout_secs = 30                        # Or set PORTICO_TIMEOUT_SECS env var

# [endpoints]
# login = "/auth/login"
# register = "/auth/register"
# logout = "/auth/logout"
# refresh = "/auth/refresh"
# current_user = "/auth/me"
# change_password = "/auth/change-password"
# forgot_password = "/auth/forgot-password"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_base_url` is from the CLI flag (None = not specified).
pub fn resolve(config: &PorticoConfig, cli_base_url: Option<&str>) -> ResolvedConfig {
    // Base URL: CLI → env → config → default
    let base_url = cli_base_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("PORTICO_BASE_URL").ok())
        .or_else(|| config.api.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Timeout: env → config → default
    let timeout_secs = std::env::var("PORTICO_TIMEOUT_SECS")
        .ok()
        .and_then(|raw| match raw.parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => {
                warn!("Ignoring unparseable PORTICO_TIMEOUT_SECS '{raw}'");
                None
            }
        })
        .or(config.api.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let paths = &config.endpoints;
    let endpoints = Endpoints {
        login: resolve_path(&paths.login, DEFAULT_LOGIN_PATH),
        register: resolve_path(&paths.register, DEFAULT_REGISTER_PATH),
        logout: resolve_path(&paths.logout, DEFAULT_LOGOUT_PATH),
        refresh: resolve_path(&paths.refresh, DEFAULT_REFRESH_PATH),
        current_user: resolve_path(&paths.current_user, DEFAULT_CURRENT_USER_PATH),
        change_password: resolve_path(&paths.change_password, DEFAULT_CHANGE_PASSWORD_PATH),
        forgot_password: resolve_path(&paths.forgot_password, DEFAULT_FORGOT_PASSWORD_PATH),
    };

    ResolvedConfig {
        base_url,
        timeout_secs,
        endpoints,
    }
}

fn resolve_path(configured: &Option<String>, default: &str) -> String {
    configured
        .clone()
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = PorticoConfig::default();
        assert!(config.api.base_url.is_none());
        assert!(config.endpoints.login.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = PorticoConfig::default();
        let resolved = resolve(&config, None);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(resolved.endpoints.login, DEFAULT_LOGIN_PATH);
        assert_eq!(resolved.endpoints.refresh, DEFAULT_REFRESH_PATH);
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = PorticoConfig {
            api: ApiConfig {
                base_url: Some("https://api.example.com/v2".to_string()),
                timeout_secs: Some(5),
            },
            endpoints: EndpointsConfig {
                login: Some("/session/new".to_string()),
                ..Default::default()
            },
        };
        let resolved = resolve(&config, None);
        assert_eq!(resolved.base_url, "https://api.example.com/v2");
        assert_eq!(resolved.timeout_secs, 5);
        assert_eq!(resolved.endpoints.login, "/session/new");
        assert_eq!(resolved.endpoints.logout, DEFAULT_LOGOUT_PATH);
    }

    #[test]
    fn test_resolve_cli_base_url_wins() {
        let config = PorticoConfig {
            api: ApiConfig {
                base_url: Some("https://config.example.com".to_string()),
                timeout_secs: None,
            },
            ..Default::default()
        };
        let resolved = resolve(&config, Some("https://cli.example.com"));
        assert_eq!(resolved.base_url, "https://cli.example.com");
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[api]
base_url = "https://staging.example.com/api"
timeout_secs = 10

[endpoints]
login = "/v2/session"
refresh = "/v2/session/refresh"
"#;
        let config: PorticoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.api.base_url.as_deref(),
            Some("https://staging.example.com/api")
        );
        assert_eq!(config.api.timeout_secs, Some(10));
        assert_eq!(config.endpoints.login.as_deref(), Some("/v2/session"));
        assert_eq!(config.endpoints.logout, None);
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing - everything else stays default
        let toml_str = r#"
[api]
timeout_secs = 3
"#;
        let config: PorticoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.timeout_secs, Some(3));
        assert!(config.api.base_url.is_none());
        assert!(config.endpoints.refresh.is_none());
    }
}
