//! Ollama API client for persona answer generation.
//!
//! Wraps the local generation service: liveness probing, model listing and
//! pulling, and single-shot (non-streaming) generation with wall-clock
//! latency capture.

mod client;
mod types;

pub use client::OllamaClient;
pub use types::{GenerateOptions, GenerateRequest, GenerateResponse, LlmReply, TagsResponse};
