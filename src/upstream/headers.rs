//! Header construction for upstream requests
//!
//! Every upstream request carries the browser identity of the upstream's own
//! web client. Client headers are never forwarded.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN,
    REFERER, USER_AGENT,
};

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Browser identity shared by the token and chat requests
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub cookie: String,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
}

impl BrowserProfile {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cookie: config.cookie.clone(),
            user_agent: config.user_agent.clone(),
            referer: config.referer.clone(),
            origin: config.origin.clone(),
        }
    }

    /// Headers for the token request: cookie plus browser identity
    pub fn token_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = self.base_headers()?;
        headers.insert(COOKIE, header_value("Cookie", &self.cookie)?);
        Ok(headers)
    }

    /// Headers for the chat request: bearer token plus browser identity
    pub fn chat_headers(&self, token: &str) -> AppResult<HeaderMap> {
        let mut headers = self.base_headers()?;
        headers.insert(
            AUTHORIZATION,
            header_value("Authorization", &format!("Bearer {}", token))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, header_value("Origin", &self.origin)?);
        Ok(headers)
    }

    fn base_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &self.user_agent)?);
        headers.insert(REFERER, header_value("Referer", &self.referer)?);
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        Ok(headers)
    }
}

fn header_value(name: &str, value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid {} header value", name)))
}
