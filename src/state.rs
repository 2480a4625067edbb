// src/state.rs

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::key_rotator::KeyRotator;
use crate::proxy::chat_completions_url;
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Shared state handed to every axum handler.
#[derive(Debug)]
pub struct AppState {
    pub key_rotator: KeyRotator,
    pub http_client: Client,
    pub upstream_url: Url,
    pub relay_chunk_size: usize,
}

impl AppState {
    /// Builds the key rotator and the shared HTTP client from `config`.
    ///
    /// Only connection pooling is tuned here; request timeouts are left at
    /// the client defaults.
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Creating shared AppState: initializing key rotator and HTTP client...");
        let key_rotator = KeyRotator::new(config.api_keys.iter().cloned())?;
        let upstream_url = chat_completions_url(&config.upstream.base_url)?;

        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(key_rotator.len().max(10))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(|e| AppError::HttpClientBuildError { source: e })?;

        info!(upstream.url = %upstream_url, keys = key_rotator.len(), "AppState initialized");
        Ok(Self {
            key_rotator,
            http_client,
            upstream_url,
            relay_chunk_size: config.upstream.relay_chunk_size,
        })
    }
}
