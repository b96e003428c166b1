//! Upstream chat backend client
//!
//! HTTP client for the token endpoint and the chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

use super::{headers::BrowserProfile, request::UpstreamChatRequest, ChatBackend, UpstreamBody};
use crate::{
    config::Config,
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
struct JwtResponse {
    #[serde(default)]
    jwt: Option<String>,
}

/// Upstream client
pub struct UpstreamClient {
    client: reqwest::Client,
    jwt_url: String,
    chat_url: String,
    profile: BrowserProfile,
    read_timeout: Duration,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            jwt_url: config.jwt_url.clone(),
            chat_url: config.chat_url.clone(),
            profile: BrowserProfile::from_config(config),
            read_timeout: config.read_timeout(),
        }
    }

    /// Fetch a fresh bearer token using the session cookie
    #[instrument(skip(self))]
    pub async fn fetch_auth_token(&self) -> AppResult<String> {
        debug!(url = %self.jwt_url, "Fetching upstream token");

        let response = self
            .client
            .get(&self.jwt_url)
            .headers(self.profile.token_headers()?)
            .timeout(self.read_timeout)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("get_jwt failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Token request failed");
            return Err(AppError::Auth(format!(
                "get_jwt failed: {} {}",
                status.as_u16(),
                text
            )));
        }

        let body: JwtResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("get_jwt failed: {}", e)))?;

        match body.jwt {
            Some(jwt) if !jwt.is_empty() => Ok(jwt),
            _ => {
                error!("Token response carried no jwt");
                Err(AppError::Auth("no jwt".to_string()))
            }
        }
    }

    /// Post a chat request and hand back the response body
    #[instrument(skip(self, body), fields(model = %body.inputs.llm_model, history = body.messages.len()))]
    pub async fn fetch_upstream(&self, body: &UpstreamChatRequest) -> AppResult<UpstreamBody> {
        let token = self.fetch_auth_token().await?;

        let send = self
            .client
            .post(&self.chat_url)
            .headers(self.profile.chat_headers(&token)?)
            .json(body)
            .send();

        let response = tokio::time::timeout(self.read_timeout, send)
            .await
            .map_err(|_| {
                error!(url = %self.chat_url, "Upstream did not answer in time");
                AppError::Internal(anyhow::anyhow!(
                    "upstream did not respond within {}s",
                    self.read_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                error!(url = %self.chat_url, error = %e, "Failed to send upstream chat request");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Upstream chat request failed");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        info!(status = %status, json = is_json, "Upstream chat response received");

        if is_json {
            Ok(UpstreamBody::Json(response.json().await?))
        } else {
            Ok(UpstreamBody::Stream(Box::pin(response.bytes_stream())))
        }
    }
}

#[async_trait]
impl ChatBackend for UpstreamClient {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn send_chat(&self, body: &UpstreamChatRequest) -> AppResult<UpstreamBody> {
        self.fetch_upstream(body).await
    }
}
