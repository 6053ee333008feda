use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ollama error: {0}")]
    Ollama(#[from] OllamaError),

    #[error("Load error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Session store errors.
///
/// "Not found" is deliberately absent: callers routinely probe for optional
/// state, so `load` returns `Option` and `update_result` returns `bool`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O failure at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to serialize session {session_id}: {message}")]
    Serialize { session_id: String, message: String },

    #[error("Corrupt session record {session_id}: {message}")]
    Deserialize { session_id: String, message: String },
}

/// Generation service (Ollama API) errors
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Ollama unreachable: {message}")]
    Unreachable { message: String },

    #[error("Request timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Persona/question definition loading errors
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid definition in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Ollama operations
pub type OllamaResult<T> = Result<T, OllamaError>;

/// Result type alias for definition loading
pub type LoaderResult<T> = Result<T, LoaderError>;
