use std::time::Instant;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::types::{GenerateRequest, GenerateResponse, LlmReply, TagsResponse};
use crate::config::{OllamaConfig, RequestConfig, SamplingConfig};
use crate::error::{OllamaError, OllamaResult};

/// Client for the Ollama HTTP API.
///
/// Holds one `reqwest::Client` per timeout class: generation calls get a
/// generous timeout, model pulls a much longer one, and liveness probes a
/// short one. No retries anywhere; transient failures surface to the caller.
#[derive(Clone)]
pub struct OllamaClient {
    generate_client: Client,
    pull_client: Client,
    probe_client: Client,
    base_url: String,
    request_config: RequestConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &OllamaConfig, request_config: RequestConfig) -> OllamaResult<Self> {
        let generate_client = Client::builder()
            .timeout(request_config.generate_timeout)
            .build()
            .map_err(OllamaError::Http)?;
        let pull_client = Client::builder()
            .timeout(request_config.pull_timeout)
            .build()
            .map_err(OllamaError::Http)?;
        let probe_client = Client::builder()
            .timeout(request_config.probe_timeout)
            .build()
            .map_err(OllamaError::Http)?;

        Ok(Self {
            generate_client,
            pull_client,
            probe_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_config,
        })
    }

    /// Best-effort liveness probe; any failure reads as "not running"
    pub async fn check_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.probe_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Ollama liveness probe failed");
                false
            }
        }
    }

    /// List model names installed on the service
    pub async fn list_models(&self) -> OllamaResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .probe_client
            .get(&url)
            .send()
            .await
            .map_err(|e| OllamaError::Unreachable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::InvalidResponse {
                message: format!("Failed to parse tags response: {}", e),
            })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate one completion, measuring wall-clock latency around the call.
    ///
    /// The caller is responsible for ensuring `model` is installed; an
    /// unknown model comes back as an API error from the service.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &SamplingConfig,
        system_prompt: Option<&str>,
    ) -> OllamaResult<LlmReply> {
        let url = format!("{}/api/generate", self.base_url);

        let mut request = GenerateRequest::new(model, prompt, config);
        if let Some(system) = system_prompt {
            request = request.with_system(system);
        }

        debug!(model = %model, prompt_chars = prompt.len(), "Calling Ollama generate");

        let start = Instant::now();
        let response = self
            .generate_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OllamaError::Timeout {
                        timeout_secs: self.request_config.generate_timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    OllamaError::Unreachable {
                        message: e.to_string(),
                    }
                } else {
                    OllamaError::Http(e)
                }
            })?;
        let generation_time = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| OllamaError::InvalidResponse {
                    message: format!("Failed to parse generate response: {}", e),
                })?;

        info!(
            model = %model,
            latency_ms = generation_time.as_millis(),
            tokens = ?body.eval_count,
            "Generation succeeded"
        );

        Ok(LlmReply {
            text: body.response,
            tokens_generated: body.eval_count,
            generation_time,
            timestamp: Utc::now(),
        })
    }

    /// Pull a model from the Ollama library; best-effort boolean success.
    ///
    /// Downloads are large, so this uses the long pull timeout.
    pub async fn pull_model(&self, model: &str) -> bool {
        let url = format!("{}/api/pull", self.base_url);

        info!(model = %model, "Pulling model from Ollama library");

        match self
            .pull_client
            .post(&url)
            .json(&serde_json::json!({ "name": model, "stream": false }))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(model = %model, error = %e, "Model pull failed");
                false
            }
        }
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
