//! OpenAI-compatible wire types
//!
//! Request parsing, response/chunk construction and SSE formatting for the
//! surface the bridge exposes.

pub mod request;
pub mod response;
pub mod sse;

pub use request::{ChatCompletionRequest, ChatMessage, MessageContent, Role};
pub use response::{ChatCompletionChunk, ChatCompletionResponse, ModelsResponse, StreamMetadata};
