use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Ollama API configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
}

/// Session store configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub results_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request timeouts, one per request class.
///
/// Generation is slow, model pulls are slower, liveness probes must be quick.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub generate_timeout: Duration,
    pub pull_timeout: Duration,
    pub probe_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let ollama = OllamaConfig {
            base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        };

        let storage = StorageConfig {
            results_dir: PathBuf::from(
                env::var("RESULTS_DIR").unwrap_or_else(|_| "./results".to_string()),
            ),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            generate_timeout: Duration::from_secs(
                env::var("GENERATE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            pull_timeout: Duration::from_secs(
                env::var("PULL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            probe_timeout: Duration::from_secs(
                env::var("PROBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        };

        Ok(Config {
            ollama,
            storage,
            logging,
            request,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            generate_timeout: Duration::from_secs(120),
            pull_timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Named sampling presets tuned for different answer styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SamplingPreset {
    Balanced,
    Creative,
    Precise,
    Deterministic,
}

/// Sampling parameters for one generation call.
///
/// Values are immutable once constructed; a preset produces a fresh value and
/// overrides go through the consuming `with_*` builders. Sessions and results
/// persist the exact value they were generated with, so the snapshot survives
/// any later preset change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    /// Maximum tokens to generate (`num_predict` on the wire).
    pub num_predict: u32,
    pub repeat_penalty: f64,
    /// Context window override; the model default applies when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
}

impl SamplingConfig {
    /// Construct the sampling values for a named preset
    pub fn preset(preset: SamplingPreset) -> Self {
        let balanced = Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            num_predict: 500,
            repeat_penalty: 1.1,
            context_window: None,
        };

        match preset {
            SamplingPreset::Balanced => balanced,
            SamplingPreset::Creative => Self {
                temperature: 0.9,
                top_p: 0.95,
                repeat_penalty: 1.05,
                ..balanced
            },
            SamplingPreset::Precise => Self {
                temperature: 0.3,
                top_p: 0.8,
                repeat_penalty: 1.2,
                ..balanced
            },
            SamplingPreset::Deterministic => Self {
                temperature: 0.1,
                top_p: 0.5,
                repeat_penalty: 1.3,
                ..balanced
            },
        }
    }

    /// Override the temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the top_p sampling parameter
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    /// Override the context window
    pub fn with_context_window(mut self, context_window: u32) -> Self {
        self.context_window = Some(context_window);
        self
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::preset(SamplingPreset::Balanced)
    }
}
