//! Chat handler: the public entry point for user queries.

use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's query or message to process
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The model's final answer
    pub content: String,
}

/// POST /api/chat - Answer a user query, using tools when the model asks.
///
/// # Flow
/// 1. Validate input shape (400 on malformed body, missing or non-string query)
/// 2. Run the two-phase tool-calling loop under the request timeout
/// 3. Map provider failures to 502 and timeouts to 503
///
/// Tool failures never change the status code; they are reported to the model.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;

    let start_time = std::time::Instant::now();
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let content = tokio::time::timeout(timeout, state.chat.answer(&request.query))
        .instrument(span.clone())
        .await
        .map_err(|_| {
            AppError::ResourceError(format!(
                "Query timed out after {}s",
                state.config.request_timeout_secs
            ))
        })??;

    let total_time = start_time.elapsed();
    span.in_scope(|| {
        tracing::info!(
            query_len = request.query.len(),
            answer_len = content.len(),
            total_ms = total_time.as_millis() as u64,
            "Chat completed"
        );
    });

    metrics::counter!("chat_requests_total").increment(1);
    metrics::histogram!("chat_latency_ms").record(total_time.as_millis() as f64);

    Ok(Json(ChatResponse { content }))
}
