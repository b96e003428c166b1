//! Reshaping OpenAI chat requests into the upstream request body

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::openai::{ChatCompletionRequest, ChatMessage, Role};

/// Budget used when a string budget is neither an effort name nor a usable number
pub const FALLBACK_THINKING_BUDGET: i64 = 2048;

/// Token budget for a named reasoning effort
pub fn effort_budget(effort: &str) -> Option<i64> {
    match effort.to_ascii_lowercase().as_str() {
        "minimal" => Some(512),
        "low" => Some(2048),
        "medium" => Some(8192),
        "high" => Some(24576),
        _ => None,
    }
}

/// The prompt to answer and the conversation preceding it
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndHistory<'a> {
    pub query: String,
    pub history: &'a [ChatMessage],
}

/// Split messages at the last user message.
///
/// Its content becomes the query and every earlier message the history.
/// Without any user message the query is empty and the whole input is history.
pub fn pick_query_and_history(messages: &[ChatMessage]) -> QueryAndHistory<'_> {
    match messages.iter().rposition(|m| m.role == Role::User) {
        Some(last_user) => QueryAndHistory {
            query: messages[last_user].text(),
            history: &messages[..last_user],
        },
        None => QueryAndHistory {
            query: String::new(),
            history: messages,
        },
    }
}

/// Resolve the thinking budget sent upstream.
///
/// Numbers pass through. Strings map through the effort table, else parse as
/// a leading integer; zero or garbage falls back to
/// [`FALLBACK_THINKING_BUDGET`]. Other JSON types are ignored. Without a
/// `thinking_budget`, a known `reasoning_effort` is used.
pub fn resolve_thinking_budget(
    thinking_budget: Option<&Value>,
    reasoning_effort: Option<&str>,
) -> Option<Number> {
    match thinking_budget {
        Some(Value::Number(n)) => Some(n.clone()),
        Some(Value::String(s)) => {
            let budget = effort_budget(s)
                .or_else(|| parse_leading_int(s))
                .filter(|b| *b != 0)
                .unwrap_or(FALLBACK_THINKING_BUDGET);
            Some(Number::from(budget))
        }
        Some(_) => None,
        None => reasoning_effort.and_then(effort_budget).map(Number::from),
    }
}

/// Parse the integer prefix of `s`, ignoring leading whitespace and any
/// trailing non-digit text ("300 tokens" reads as 300).
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// `inputs` block of the upstream request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamInputs {
    pub llm_model: String,
    pub web_search: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<Number>,
}

/// History entry in upstream format
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamMessage {
    pub id: Value,
    pub role: Role,
    pub content: String,
    pub token: Value,
    pub llm_model: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Upstream chat request body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamChatRequest {
    pub messages: Vec<UpstreamMessage>,
    pub query: String,
    pub conversation_id: String,
    pub user: String,
    pub inputs: UpstreamInputs,
    pub response_mode: String,
}

impl UpstreamChatRequest {
    /// Build the upstream body for `request` answered by `model`.
    pub fn from_openai(
        request: &ChatCompletionRequest,
        model: &str,
        user: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let QueryAndHistory { query, history } = pick_query_and_history(&request.messages);
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let messages = history
            .iter()
            .enumerate()
            .map(|(idx, m)| UpstreamMessage {
                id: m.id.clone().unwrap_or_else(|| Value::from(idx)),
                role: m.role,
                content: m.text(),
                token: m.token.clone().unwrap_or_else(|| Value::from(1)),
                llm_model: m.llm_model.clone().unwrap_or_else(|| model.to_string()),
                created_at: m.created_at.clone().unwrap_or_else(|| timestamp.clone()),
                updated_at: m.updated_at.clone().unwrap_or_else(|| timestamp.clone()),
                deleted_at: m.deleted_at.clone(),
            })
            .collect();

        Self {
            messages,
            query,
            conversation_id: request.conversation_id.clone().unwrap_or_default(),
            user: user.to_string(),
            inputs: UpstreamInputs {
                llm_model: model.to_string(),
                web_search: "off".to_string(),
                thinking_budget: resolve_thinking_budget(
                    request.thinking_budget.as_ref(),
                    request.reasoning_effort.as_deref(),
                ),
            },
            response_mode: "streaming".to_string(),
        }
    }
}
