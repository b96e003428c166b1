//! Response types for the OpenAI-compatible surface
//!
//! Defines the non-streaming completion, the streaming chunk and the model
//! list, together with the builders the chat handler uses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::Role;

pub const FINISH_REASON_STOP: &str = "stop";
pub const SYSTEM_FINGERPRINT: &str = "fp_1";

/// Current Unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Fresh completion identifier
pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Always serialized as `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionTokensDetails {}

/// Token usage statistics. The upstream reports none, so these stay zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub completion_tokens_details: CompletionTokensDetails,
}

/// Assistant message of a completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    pub role: Role,
    pub content: String,
    pub refusal: Option<String>,
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// Chat completion response (non-streaming)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub system_fingerprint: String,
}

impl ChatCompletionResponse {
    /// Wrap a finished answer into a single-choice completion
    pub fn from_text(id: String, model: &str, text: String) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created: unix_now(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: AssistantMessage {
                    role: Role::Assistant,
                    content: text,
                    refusal: None,
                },
                finish_reason: Some(FINISH_REASON_STOP.to_string()),
            }],
            usage: Usage::default(),
            system_fingerprint: SYSTEM_FINGERPRINT.to_string(),
        }
    }
}

/// Delta carried by a streaming chunk; empty serializes as `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Streaming choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

/// Metadata shared by every chunk of one streamed completion.
#[derive(Debug, Clone)]
pub struct StreamMetadata {
    pub id: String,
    pub model: String,
}

impl StreamMetadata {
    pub fn new(model: &str) -> Self {
        Self {
            id: completion_id(),
            model: model.to_string(),
        }
    }

    /// Chunk carrying one text fragment. An empty fragment yields an empty delta.
    pub fn fragment_chunk(&self, fragment: &str) -> ChatCompletionChunk {
        let delta = if fragment.is_empty() {
            Delta::default()
        } else {
            Delta {
                role: Some(Role::Assistant),
                content: Some(fragment.to_string()),
            }
        };
        self.chunk(delta, None)
    }

    /// Final chunk with `finish_reason: "stop"`
    pub fn finish_chunk(&self) -> ChatCompletionChunk {
        self.chunk(Delta::default(), Some(FINISH_REASON_STOP.to_string()))
    }

    fn chunk(&self, delta: Delta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: unix_now(),
            model: self.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl Model {
    pub fn new(id: &str, created: i64) -> Self {
        Self {
            id: id.to_string(),
            object: "model".to_string(),
            created,
            owned_by: "openai".to_string(),
        }
    }
}

/// Models list response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

impl ModelsResponse {
    pub fn from_ids<S: AsRef<str>>(ids: &[S], created: i64) -> Self {
        Self {
            object: "list".to_string(),
            data: ids.iter().map(|id| Model::new(id.as_ref(), created)).collect(),
        }
    }
}
