//! # Persona Bench
//!
//! A behavioral-prediction test bench for persona-conditioned local LLMs.
//! Persona Bench sends persona-framed questions to an Ollama model, records
//! the generated answers next to human ground-truth answers, and reports
//! similarity-based accuracy metrics.
//!
//! ## Workflow
//!
//! - **Test**: render a persona into a role-play system prompt, ask each
//!   question in order, and persist the session as it grows.
//! - **Review**: walk the unreviewed answers, collect the real person's
//!   response and a 1-5 similarity score, saving each judgment immediately.
//! - **Analyze**: aggregate reviewed scores into per-session reports,
//!   compare sessions across models, and export CSV/JSON.
//!
//! ## Architecture
//!
//! ```text
//! CLI → TestRunner → (PromptBuilder, OllamaClient HTTP) → JSON session store
//!                    ReviewWorkflow ─────────────────────┘        ↓
//!                    Analytics ← ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ reports/exports
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use persona_bench::config::{Config, SamplingConfig, SamplingPreset};
//! use persona_bench::ollama::OllamaClient;
//! use persona_bench::runner::TestRunner;
//! use persona_bench::storage::JsonFileStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let ollama = OllamaClient::new(&config.ollama, config.request.clone())?;
//!     let storage = Arc::new(JsonFileStorage::new(&config.storage.results_dir)?);
//!     let runner = TestRunner::new(ollama, storage);
//!     let sampling = SamplingConfig::preset(SamplingPreset::Balanced);
//!     let session = runner
//!         .run_test("personas/alex.yaml", "questions/shopping.yaml", "llama3:8b", sampling, None)
//!         .await?;
//!     println!("session: {}", session.session_id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Report generation, session comparison, and CSV/JSON export.
pub mod analytics;
/// Configuration management and sampling presets.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Ollama API client for answer generation.
pub mod ollama;
/// Persona and question-set schemas with YAML loaders.
pub mod persona;
/// Deterministic persona prompt rendering.
pub mod prompt;
/// Interactive review workflow over pending results.
pub mod review;
/// Test orchestration across a question set.
pub mod runner;
/// Session data model and file-per-session persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
