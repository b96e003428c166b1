//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions API endpoint.
//! Handles both streaming and non-streaming responses.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    openai::{
        response::completion_id,
        sse::{format_error_event, format_sse_chunk, format_sse_done},
        ChatCompletionRequest, ChatCompletionResponse, StreamMetadata,
    },
    routes::metrics::{record_fragments, record_request, record_upstream_error},
    streaming::{collect_text, text_from_json_body, upstream_events},
    upstream::{UpstreamBody, UpstreamChatRequest},
    AppState,
};

/// Handle chat completion requests
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    let model = request
        .model
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    let is_streaming = request.stream;

    info!(
        model = %model,
        stream = %is_streaming,
        messages = %request.messages.len(),
        "Processing chat completion request"
    );

    let upstream_request =
        UpstreamChatRequest::from_openai(&request, &model, &state.config.upstream_user, Utc::now());

    let upstream = match state.backend.send_chat(&upstream_request).await {
        Ok(upstream) => upstream,
        Err(e) => {
            record_request("error", &model, start_time.elapsed().as_secs_f64());
            record_upstream_error(match &e {
                AppError::Auth(_) => "auth",
                AppError::Upstream { .. } => "status",
                _ => "transport",
            });
            warn!(model = %model, backend = state.backend.name(), error = %e, "Upstream request failed");
            return Err(e);
        }
    };

    if is_streaming {
        handle_streaming_chat(&state, upstream, model, start_time)
    } else {
        handle_non_streaming_chat(&state, upstream, model, start_time).await
    }
}

/// Handle non-streaming chat completion
async fn handle_non_streaming_chat(
    state: &AppState,
    upstream: UpstreamBody,
    model: String,
    start_time: Instant,
) -> Result<Response, AppError> {
    let text = match upstream {
        UpstreamBody::Json(value) => text_from_json_body(&value),
        UpstreamBody::Stream(bytes) => {
            collect_text(upstream_events(bytes, state.config.read_timeout()))
                .await
                .map_err(|e| {
                    record_request("error", &model, start_time.elapsed().as_secs_f64());
                    AppError::Internal(e.into())
                })?
        }
    };

    let duration = start_time.elapsed().as_secs_f64();
    record_request("success", &model, duration);

    info!(
        model = %model,
        chars = text.chars().count(),
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Chat completion request completed"
    );

    let response = ChatCompletionResponse::from_text(completion_id(), &model, text);
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handle streaming chat completion
fn handle_streaming_chat(
    state: &AppState,
    upstream: UpstreamBody,
    model: String,
    start_time: Instant,
) -> Result<Response, AppError> {
    let metadata = StreamMetadata::new(&model);
    let body = Body::from_stream(sse_body(upstream, metadata, state.config.read_timeout()));

    // Final duration is unknown here; this records time to first byte.
    record_request("streaming", &model, start_time.elapsed().as_secs_f64());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// SSE body: one chunk per fragment, then the finish chunk and `[DONE]`.
///
/// The finish chunk is sent whether the upstream ended with a terminal event,
/// simply closed, or failed mid-way.
fn sse_body(
    upstream: UpstreamBody,
    metadata: StreamMetadata,
    read_timeout: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut fragments: u64 = 0;

        match upstream {
            UpstreamBody::Json(value) => {
                fragments += 1;
                yield Ok(format_sse_chunk(&metadata.fragment_chunk(&text_from_json_body(&value))));
            }
            UpstreamBody::Stream(bytes) => {
                let mut events = Box::pin(upstream_events(bytes, read_timeout));

                while let Some(item) = events.next().await {
                    match item {
                        Ok(event) => {
                            if let Some(fragment) = event.fragment() {
                                fragments += 1;
                                yield Ok(format_sse_chunk(&metadata.fragment_chunk(fragment)));
                            }
                            if event.is_terminal() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(model = %metadata.model, error = %e, "Upstream stream ended early");
                            record_upstream_error(e.code());
                            yield Ok(format_error_event(&e.to_string(), Some(e.code())));
                            break;
                        }
                    }
                }
            }
        }

        record_fragments(&metadata.model, fragments);
        debug!(id = %metadata.id, fragments, "Stream finished");

        yield Ok(format_sse_chunk(&metadata.finish_chunk()));
        yield Ok(format_sse_done());
    }
}
