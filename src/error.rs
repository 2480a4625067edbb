// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Body of every locally synthesized error response.
///
/// `error` carries the human-readable message, `type` a stable
/// machine-readable kind.
#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "type")]
    error_type: &'static str,
}

/// Errors that can occur while starting the proxy or serving a request.
///
/// Startup errors (`Config`, `NoCredentials`, `YamlParsing`, ...) are fatal and
/// abort `run()`. Per-request errors are turned into an HTTP response through
/// `IntoResponse` and never affect shared state.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No API keys configured; at least one credential is required")]
    NoCredentials,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlParsing(#[from] serde_yaml::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client build error: {source}")]
    HttpClientBuildError { source: reqwest::Error },

    #[error("Upstream request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid JSON in request body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("HTTP response builder error: {0}")]
    HttpResponseBuilder(#[from] http::Error),
}

impl AppError {
    /// Maps the error to the status code and kind reported to the client.
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
            Self::Reqwest(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR"),
            Self::HttpResponseBuilder(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RESPONSE_BUILD_ERROR")
            }
            Self::NoCredentials => (StatusCode::INTERNAL_SERVER_ERROR, "NO_CREDENTIALS"),
            Self::Config(_) | Self::UrlParse(_) | Self::YamlParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            Self::HttpClientBuildError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "HTTP_CLIENT_BUILD_ERROR")
            }
            Self::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        if status.is_server_error() {
            error!(error_type, error = %self, "Request failed");
        } else {
            warn!(error_type, error = %self, "Rejected request");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            error_type,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
