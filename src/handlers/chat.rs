// src/handlers/chat.rs

use crate::{error::Result, proxy, state::AppState};
use axum::{body::Bytes, extract::State, response::Response};
use serde::de::IgnoredAny;
use std::sync::Arc;
use tracing::instrument;

/// `POST /api/nvidia-proxy/chat/completions`
///
/// Rejects bodies that are not valid JSON with `400` before any key is
/// consumed. Valid bodies are forwarded untouched with the next key in
/// rotation, and the upstream answer is streamed back.
#[instrument(name = "chat_completions", skip_all, fields(body.bytes = body.len()))]
pub async fn chat_completions_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response> {
    serde_json::from_slice::<IgnoredAny>(&body)?;

    let api_key = state.key_rotator.next();
    proxy::forward_chat_completion(
        &state.http_client,
        &state.upstream_url,
        api_key,
        body,
        state.relay_chunk_size,
    )
    .await
}
