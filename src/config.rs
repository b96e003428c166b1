//! Configuration management for Chat Bridge
//!
//! Configuration is loaded from environment variables. Every value has a
//! default so the bridge starts with an empty environment.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

/// Endpoint issuing the short-lived bearer token
pub const DEFAULT_JWT_URL: &str = "https://beta.aiipo.jp/apmng/chat/get_jwt.php";
/// Upstream chat endpoint
pub const DEFAULT_CHAT_URL: &str = "https://x162-43-21-174.static.xvps.ne.jp/chat";
/// Browser identity presented to the upstream
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://beta.aiipo.jp/apmng/chat/llm_chat.php?chat_id=-1&p=0";
pub const DEFAULT_ORIGIN: &str = "https://beta.aiipo.jp";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite-preview-06-17";

/// Models advertised on `/v1/models` unless `AVAILABLE_MODELS` overrides them
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash-lite-preview-06-17",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gpt-4.1-nano-2025-04-14",
    "gpt-4.1-mini-2025-04-14",
    "gpt-4.1-2025-04-14",
    "gpt-4o-2024-11-20",
    "o4-mini-2025-04-16",
    "gpt-5",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Token endpoint URL
    pub jwt_url: String,
    /// Chat endpoint URL
    pub chat_url: String,
    /// Session cookie forwarded to the token endpoint
    pub cookie: String,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    /// `user` field sent with every upstream chat request
    pub upstream_user: String,

    /// Model used when a request omits one
    pub default_model: String,
    /// Fixed list of advertised model ids
    pub models: Vec<String>,

    /// Upper bound on waiting for any single upstream read
    pub read_timeout_secs: u64,
    /// Upper bound on establishing an upstream connection
    pub connect_timeout_secs: u64,

    /// Directory served for unmatched paths, if any
    pub static_dir: Option<String>,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            jwt_url: DEFAULT_JWT_URL.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            cookie: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            upstream_user: "web-user".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            read_timeout_secs: 120,
            connect_timeout_secs: 10,
            static_dir: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: match var("PORT") {
                Some(v) => v.trim().parse().context("Invalid PORT")?,
                None => defaults.port,
            },

            jwt_url: var("JWT_URL").unwrap_or(defaults.jwt_url),
            chat_url: var("CHAT_URL").unwrap_or(defaults.chat_url),
            cookie: lookup("FULL_COOKIE").unwrap_or_default(),
            user_agent: var("UPSTREAM_USER_AGENT").unwrap_or(defaults.user_agent),
            referer: var("UPSTREAM_REFERER").unwrap_or(defaults.referer),
            origin: var("UPSTREAM_ORIGIN").unwrap_or(defaults.origin),
            upstream_user: var("UPSTREAM_USER").unwrap_or(defaults.upstream_user),

            default_model: var("DEFAULT_MODEL").unwrap_or(defaults.default_model),
            models: match var("AVAILABLE_MODELS") {
                Some(list) => parse_model_list(&list),
                None => defaults.models,
            },

            read_timeout_secs: match var("UPSTREAM_READ_TIMEOUT_SECS") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("Invalid UPSTREAM_READ_TIMEOUT_SECS")?,
                None => defaults.read_timeout_secs,
            },
            connect_timeout_secs: match var("UPSTREAM_CONNECT_TIMEOUT_SECS") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("Invalid UPSTREAM_CONNECT_TIMEOUT_SECS")?,
                None => defaults.connect_timeout_secs,
            },

            static_dir: var("STATIC_DIR"),

            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// Hand-written so the session cookie never reaches logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_url", &self.jwt_url)
            .field("chat_url", &self.chat_url)
            .field("cookie", &if self.cookie.is_empty() { "" } else { "<redacted>" })
            .field("user_agent", &self.user_agent)
            .field("referer", &self.referer)
            .field("origin", &self.origin)
            .field("upstream_user", &self.upstream_user)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("static_dir", &self.static_dir)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_model_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
