// src/proxy.rs

use crate::error::{AppError, Result};
use crate::key_rotator::KeyRotator;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use futures_util::TryStreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::io;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info, warn};
use url::Url;

/// Path appended to the upstream base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Builds the chat-completions endpoint from the configured base URL.
pub fn chat_completions_url(base_url: &str) -> Result<Url> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH);
    Ok(Url::parse(&joined)?)
}

/// Sends `body` upstream with `api_key` and relays the answer.
///
/// The body is forwarded byte-for-byte; callers are expected to have checked
/// that it is valid JSON. The upstream status code and content-type are
/// copied to the returned response and the upstream body is streamed back in
/// chunks of at most `chunk_size` bytes without being buffered as a whole.
///
/// Errors before the upstream response head arrives (connection refused, DNS,
/// TLS, ...) are returned as [`AppError::Reqwest`]. A key that cannot be sent
/// as a bearer header fails with [`AppError::Config`] and nothing is sent.
/// Errors while reading the upstream body end the relayed stream.
pub async fn forward_chat_completion(
    http_client: &Client,
    target_url: &Url,
    api_key: &SecretString,
    body: Bytes,
    chunk_size: usize,
) -> Result<Response> {
    let key_preview = KeyRotator::preview_key(api_key);
    info!(url = %target_url, api_key.preview = %key_preview, body.bytes = body.len(), "Forwarding request to upstream");

    let upstream_response = http_client
        .post(target_url.clone())
        .headers(build_forward_headers(api_key)?)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            debug!(url = %target_url, api_key.preview = %key_preview, error = %e, "Upstream send failed");
            AppError::from(e)
        })?;

    let status = upstream_response.status();
    let content_type = relay_content_type(upstream_response.headers());
    info!(status = %status, content_type = ?content_type, "Received response from upstream");

    let byte_stream = upstream_response.bytes_stream().map_err(move |e| {
        warn!(status = %status, error = %e, "Error reading upstream response body stream");
        io::Error::new(io::ErrorKind::Other, e)
    });
    let relayed = ReaderStream::with_capacity(StreamReader::new(byte_stream), chunk_size);

    let client_response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(relayed))?;

    debug!("Streaming upstream body to client");
    Ok(client_response)
}

/// Headers of the outgoing request: bearer authorization and JSON content type.
fn build_forward_headers(api_key: &SecretString) -> Result<HeaderMap> {
    let mut bearer_value = bearer_header_value(api_key.expose_secret()).map_err(|e| {
        debug!(api_key.preview = %KeyRotator::preview_key(api_key), error = %e, "API key is not a valid header value");
        e
    })?;
    bearer_value.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::AUTHORIZATION, bearer_value);
    Ok(headers)
}

/// `Bearer <key>` as a header value.
///
/// Fails with [`AppError::Config`] when the key holds bytes a header value
/// cannot carry (control characters, for instance).
pub fn bearer_header_value(api_key: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
        AppError::Config("API key contains characters not allowed in an HTTP header".to_string())
    })
}

/// Upstream content type, or `application/json` when upstream sent none.
pub fn relay_content_type(upstream_headers: &HeaderMap) -> HeaderValue {
    upstream_headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"))
}
