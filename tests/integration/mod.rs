//! Integration tests for Chat Bridge
//!
//! These tests run the real router against a mock upstream and verify the
//! complete request/response flow, from request reshaping to the translated
//! stream.

mod chat_completions;
mod models;
