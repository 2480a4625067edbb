//! Common test utilities and fixtures
#![allow(dead_code)]

use axum::Router;
use nvidia_proxy::{config::AppConfig, create_router, AppState};
use std::sync::Arc;

/// Test configuration builder
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_keys.push(key.into());
        self
    }

    pub fn with_api_keys(mut self, keys: &[&str]) -> Self {
        self.config
            .api_keys
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Points the upstream at `{uri}/v1`, the layout of the real API.
    pub fn with_upstream(mut self, uri: &str) -> Self {
        self.config.upstream.base_url = format!("{}/v1", uri.trim_end_matches('/'));
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.upstream.relay_chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a router over a fresh `AppState`.
pub fn test_router(config: &AppConfig) -> Router {
    let state = AppState::new(config).expect("Failed to create AppState for test");
    create_router(Arc::new(state))
}

/// Upstream path the proxy posts to when built with `with_upstream`.
pub const UPSTREAM_CHAT_PATH: &str = "/v1/chat/completions";

/// Test utilities for HTTP requests
pub mod http {
    use axum::{body::Body, http::Request};
    use nvidia_proxy::CHAT_COMPLETIONS_ROUTE;
    use serde_json::Value;

    pub fn chat_request(body: &Value) -> Request<Body> {
        raw_chat_request(body.to_string())
    }

    pub fn raw_chat_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(CHAT_COMPLETIONS_ROUTE)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    pub fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }
}

/// Test assertions and utilities
pub mod assertions {
    use axum::{body::to_bytes, response::Response};
    use serde_json::Value;

    pub async fn assert_json_response(response: Response, expected_status: u16) -> Value {
        assert_eq!(response.status().as_u16(), expected_status);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).expect("Response body should be valid JSON")
    }

    pub async fn assert_error_response(
        response: Response,
        expected_status: u16,
        error_type: &str,
    ) -> Value {
        let json = assert_json_response(response, expected_status).await;

        assert!(
            json["error"].is_string(),
            "Error response should have a string 'error' field: {json}"
        );
        assert_eq!(json["type"], error_type, "Error type mismatch");

        json
    }
}
