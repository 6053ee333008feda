use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{Storage, TestSession};
use crate::error::{StorageError, StorageResult};

/// File-per-session JSON store.
///
/// Each session lives at `<results_dir>/<session_id>.json` as pretty-printed
/// JSON, overwritten whole on every save.
#[derive(Clone)]
pub struct JsonFileStorage {
    results_dir: PathBuf,
}

impl JsonFileStorage {
    /// Create a store rooted at `results_dir`, creating the directory if
    /// missing.
    pub fn new(results_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let results_dir = results_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&results_dir).map_err(|e| StorageError::Io {
            path: results_dir.clone(),
            message: format!("Failed to create results directory: {}", e),
        })?;

        info!(dir = %results_dir.display(), "Session store initialized");

        Ok(Self { results_dir })
    }

    /// Path of the record backing `session_id`
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.results_dir.join(format!("{}.json", session_id))
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn save(&self, session: &TestSession) -> StorageResult<()> {
        let path = self.session_path(&session.session_id);

        let body =
            serde_json::to_string_pretty(session).map_err(|e| StorageError::Serialize {
                session_id: session.session_id.clone(),
                message: e.to_string(),
            })?;

        fs::write(&path, body).await.map_err(|e| StorageError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        debug!(session_id = %session.session_id, results = session.results.len(), "Session saved");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> StorageResult<Option<TestSession>> {
        let path = self.session_path(session_id);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Io {
                    path,
                    message: e.to_string(),
                })
            }
        };

        let session = serde_json::from_str(&raw).map_err(|e| StorageError::Deserialize {
            session_id: session_id.to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(session))
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.results_dir)
            .await
            .map_err(|e| StorageError::Io {
                path: self.results_dir.clone(),
                message: e.to_string(),
            })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| StorageError::Io {
            path: self.results_dir.clone(),
            message: e.to_string(),
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        // Lexical order doubles as a stable enumeration order for callers
        ids.sort();
        Ok(ids)
    }
}
