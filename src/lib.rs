//! Chat Bridge - OpenAI-compatible adapter for an SSE chat backend
//!
//! This library provides the core functionality for the Chat Bridge server.
//! It reshapes OpenAI chat completion requests for the upstream backend and
//! translates the upstream event stream back into OpenAI responses.

pub mod config;
pub mod error;
pub mod openai;
pub mod routes;
pub mod streaming;
pub mod upstream;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::error::{AppError, AppResult};
pub use crate::upstream::{ChatBackend, UpstreamClient};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Backend answering chat requests
    pub backend: Arc<dyn ChatBackend>,
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state talking to the configured upstream
    pub fn new(config: Config) -> Result<Self> {
        // No overall request timeout: streamed answers can run long. Each
        // read is bounded separately.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(config.connect_timeout())
            .build()?;

        let backend: Arc<dyn ChatBackend> = Arc::new(UpstreamClient::new(http_client, &config));

        Ok(Self::with_backend(config, backend))
    }

    /// Create an application state around an existing backend
    pub fn with_backend(config: Config, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            start_time: Instant::now(),
        }
    }
}
