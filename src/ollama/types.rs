use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SamplingConfig;

/// Request body for `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Disabled so the whole completion arrives in one response
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub options: GenerateOptions,
}

/// Sampling options in Ollama wire form
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub num_predict: u32,
    pub repeat_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

impl From<&SamplingConfig> for GenerateOptions {
    fn from(config: &SamplingConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            num_predict: config.num_predict,
            repeat_penalty: config.repeat_penalty,
            num_ctx: config.context_window,
        }
    }
}

impl GenerateRequest {
    /// Build a non-streaming generate request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, config: &SamplingConfig) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            system: None,
            options: GenerateOptions::from(config),
        }
    }

    /// Attach a system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Response body from `POST /api/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    pub eval_count: Option<u32>,
}

/// Response body from `GET /api/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// One installed model entry from `/api/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// One completed generation, with client-side timing attached
#[derive(Debug, Clone)]
pub struct LlmReply {
    /// Generated answer text
    pub text: String,
    /// Token count as reported by the service, when present
    pub tokens_generated: Option<u32>,
    /// Wall-clock latency measured around the HTTP call
    pub generation_time: Duration,
    /// When the reply was received
    pub timestamp: DateTime<Utc>,
}
