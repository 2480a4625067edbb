// src/lib.rs

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key_rotator;
pub mod proxy;
pub mod state;

use crate::handlers::{chat_completions_handler, status_handler};
use axum::{
    body::Body,
    http::{HeaderValue, Request as AxumRequest},
    response::Response,
    routing::{get, post},
    Router,
};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub use config::{AppConfig, ServerOverrides};
pub use error::{AppError, Result};
pub use key_rotator::KeyRotator;
pub use state::AppState;

/// Route that forwards chat completions upstream.
pub const CHAT_COMPLETIONS_ROUTE: &str = "/api/nvidia-proxy/chat/completions";

/// Builds the axum router for the proxy.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(CHAT_COMPLETIONS_ROUTE, post(chat_completions_handler))
        .route("/test", get(status_handler))
        .route("/status", get(status_handler))
        .layer(axum::middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Attaches a request ID and a tracing span to every request.
async fn trace_requests(mut req: AxumRequest<Body>, next: axum::middleware::Next) -> Response {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        http.method = %method,
        url.path = %path,
    );

    req.extensions_mut().insert(request_id);

    async move {
        let mut response = next.run(req).await;
        let elapsed = start_time.elapsed();

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert("X-Request-ID", value);
        }

        // Logged when the response head is ready; streamed bodies may still be in flight.
        info!(
            http.response.duration = ?elapsed,
            http.status_code = response.status().as_u16(),
            "Finished processing request"
        );

        response
    }
    .instrument(span)
    .await
}

/// Loads configuration and builds the application state and router.
pub async fn run(config_path_override: Option<PathBuf>) -> Result<(Router, AppConfig)> {
    run_with_overrides(config_path_override, &ServerOverrides::default()).await
}

/// [`run`] with a command-line listen address that is validated along with
/// the rest of the configuration.
pub async fn run_with_overrides(
    config_path_override: Option<PathBuf>,
    overrides: &ServerOverrides,
) -> Result<(Router, AppConfig)> {
    info!("Starting NVIDIA API key rotation proxy...");

    let app_config = setup_configuration(config_path_override, overrides)?;

    let app_state = AppState::new(&app_config).map_err(|e| {
        error!(error = ?e, "Failed to initialize application state. Exiting.");
        e
    })?;
    info!("Application state initialized successfully.");

    Ok((create_router(Arc::new(app_state)), app_config))
}

/// Resolves the config path, then loads, validates and logs the configuration.
///
/// The path comes from the override, then `CONFIG_PATH`, then `config.yaml`.
pub fn setup_configuration(
    config_path_override: Option<PathBuf>,
    overrides: &ServerOverrides,
) -> Result<AppConfig> {
    let config_path = config_path_override.unwrap_or_else(|| {
        std::env::var("CONFIG_PATH").map_or_else(|_| PathBuf::from("config.yaml"), PathBuf::from)
    });
    let config_path_display = config_path.display().to_string();

    let app_config = config::load_config_with_overrides(&config_path, overrides).map_err(|e| {
        error!(
            config.path = %config_path_display,
            error = ?e,
            "Failed to load or validate configuration. Exiting."
        );
        e
    })?;

    info!(
        config.path = %config_path_display,
        config.total_keys = app_config.api_keys.len(),
        upstream.base_url = %app_config.upstream.base_url,
        server.port = app_config.server.port,
        "Configuration loaded and validated successfully."
    );

    Ok(app_config)
}
