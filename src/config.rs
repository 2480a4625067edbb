// src/config.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, io, path::Path};
use tracing::{error, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::proxy::bearer_header_value;

/// Root of the application configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Credentials used round-robin for upstream requests.
    /// Overridden by `NVIDIA_API_KEYS` when that variable is set.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Network address the proxy listens on.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// The inference API requests are forwarded to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL; `/chat/completions` is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound for the size of each relayed body chunk, in bytes.
    #[serde(default = "default_relay_chunk_size")]
    pub relay_chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: default_base_url(),
            relay_chunk_size: default_relay_chunk_size(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    5000
}
pub fn default_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}
fn default_relay_chunk_size() -> usize {
    8 * 1024
}

// Environment variable names
pub const API_KEYS_ENV: &str = "NVIDIA_API_KEYS";
pub const API_BASE_ENV: &str = "NVIDIA_API_BASE";
pub const PORT_ENV: &str = "PORT";

/// Splits a comma-separated credential list, trimming each entry and
/// dropping blank ones.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Listen address given on the command line; wins over file and environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerOverrides {
    fn apply(&self, server: &mut ServerConfig) {
        if let Some(host) = &self.host {
            info!(server.host = %host, "Overriding server host from command line");
            server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            info!(server.port = port, "Overriding server port from command line");
            server.port = port;
        }
    }
}

/// Loads configuration from an optional YAML file, applies environment
/// overrides and validates the result.
///
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    load_config_with_overrides(path, &ServerOverrides::default())
}

/// Like [`load_config`], with command-line overrides applied after the
/// environment and before validation.
pub fn load_config_with_overrides(path: &Path, overrides: &ServerOverrides) -> Result<AppConfig> {
    let path_str = path.display().to_string();

    let mut config = match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => {
            warn!(config.path = %path_str, "Config file is empty. Using defaults.");
            AppConfig::default()
        }
        Ok(contents) => {
            let parsed: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
                error!(config.path = %path_str, error = %e, "Failed to parse YAML config file");
                e
            })?;
            info!(config.path = %path_str, "Loaded configuration file");
            parsed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(config.path = %path_str, "Config file not found. Using defaults and environment variables.");
            AppConfig::default()
        }
        Err(e) => {
            return Err(AppError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read config file '{path_str}': {e}"),
            )))
        }
    };

    override_with_env(&mut config);
    overrides.apply(&mut config.server);

    config.upstream.base_url = config.upstream.base_url.trim_end_matches('/').to_string();

    validate_config(&config)?;
    Ok(config)
}

fn override_with_env(config: &mut AppConfig) {
    if let Ok(raw_keys) = env::var(API_KEYS_ENV) {
        let keys = parse_api_keys(&raw_keys);
        info!(count = keys.len(), "Using API keys from {}", API_KEYS_ENV);
        config.api_keys = keys;
    }

    if let Ok(base_url) = env::var(API_BASE_ENV) {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            warn!("{} is set but empty. It will be ignored.", API_BASE_ENV);
        } else {
            info!(upstream.base_url = %base_url, "Overriding upstream base URL from environment");
            config.upstream.base_url = base_url.to_string();
        }
    }

    if let Ok(port_str) = env::var(PORT_ENV) {
        match port_str.trim().parse::<u16>() {
            Ok(port) => {
                info!(server.port = port, "Overriding server port from environment");
                config.server.port = port;
            }
            Err(_) => warn!("Invalid {} environment variable: {}", PORT_ENV, port_str),
        }
    }
}

/// Checks a configuration for values the proxy cannot start with.
pub fn validate_config(cfg: &AppConfig) -> Result<()> {
    if cfg.server.host.trim().is_empty() {
        return Err(AppError::Config("server.host must not be empty".to_string()));
    }
    if cfg.server.port == 0 {
        return Err(AppError::Config("server.port must not be 0".to_string()));
    }
    if cfg.upstream.relay_chunk_size == 0 {
        return Err(AppError::Config(
            "upstream.relay_chunk_size must be greater than 0".to_string(),
        ));
    }

    let base_url = Url::parse(&cfg.upstream.base_url)?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "upstream.base_url ('{}') must use http or https",
            cfg.upstream.base_url
        )));
    }
    if base_url.query().is_some() {
        return Err(AppError::Config(format!(
            "upstream.base_url ('{}') must not contain a query string",
            cfg.upstream.base_url
        )));
    }

    if cfg.api_keys.is_empty() {
        error!(
            "No API keys configured. Set {} (comma-separated) or api_keys in the config file.",
            API_KEYS_ENV
        );
        return Err(AppError::NoCredentials);
    }
    if cfg.api_keys.iter().any(|key| key.trim().is_empty()) {
        return Err(AppError::Config(
            "api_keys contains empty key strings".to_string(),
        ));
    }
    for (index, key) in cfg.api_keys.iter().enumerate() {
        bearer_header_value(key).map_err(|_| {
            AppError::Config(format!(
                "api_keys[{index}] contains characters not allowed in an HTTP header"
            ))
        })?;
    }

    Ok(())
}
