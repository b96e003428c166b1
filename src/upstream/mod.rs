//! Upstream chat backend
//!
//! Request reshaping, header construction and the HTTP client talking to the
//! proprietary chat backend.

pub mod client;
pub mod headers;
pub mod request;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::AppResult;

pub use client::UpstreamClient;
pub use request::{pick_query_and_history, resolve_thinking_budget, UpstreamChatRequest};

/// Raw byte stream of an upstream response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Successful upstream response body
pub enum UpstreamBody {
    /// Event stream, still to be translated
    Stream(ByteStream),
    /// Complete JSON answer
    Json(serde_json::Value),
}

/// Backend answering chat requests.
///
/// Implementations own authentication towards the backend; callers only hand
/// over the reshaped request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Send one chat request and return the successful response body
    async fn send_chat(&self, body: &UpstreamChatRequest) -> AppResult<UpstreamBody>;
}
