use std::path::Path;

use tracing::info;

use super::Analytics;
use crate::error::{AppResult, StorageError};
use crate::storage::TestSession;

/// Question text longer than this is cut to a prefix plus an ellipsis in CSV
const QUESTION_PREFIX_CHARS: usize = 100;

const CSV_HEADER: &str = "question_id,question_type,question_text,llm_response,actual_response,\
similarity_score,notes,reviewed,generation_time,tokens_generated";

impl Analytics {
    /// Export one row per result (reviewed or not) as CSV.
    ///
    /// Returns `false` when the session does not exist.
    pub async fn export_csv(&self, session_id: &str, path: impl AsRef<Path>) -> AppResult<bool> {
        let Some(session) = self.storage.load(session_id).await? else {
            return Ok(false);
        };

        let path = path.as_ref();
        let csv = session_to_csv(&session);
        tokio::fs::write(path, csv)
            .await
            .map_err(|e| StorageError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        info!(session_id = %session_id, path = %path.display(), "CSV export written");
        Ok(true)
    }

    /// Export the full report (or its no-reviews marker) as pretty JSON.
    ///
    /// Returns `false` when the session does not exist.
    pub async fn export_report_json(
        &self,
        session_id: &str,
        path: impl AsRef<Path>,
    ) -> AppResult<bool> {
        let Some(outcome) = self.generate_report(session_id).await? else {
            return Ok(false);
        };

        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(&outcome).map_err(|e| StorageError::Serialize {
                session_id: session_id.to_string(),
                message: e.to_string(),
            })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| StorageError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        info!(session_id = %session_id, path = %path.display(), "JSON report written");
        Ok(true)
    }
}

/// Render a session as CSV, one row per result in stored order.
///
/// Missing optional fields render as empty cells; question text is truncated
/// to its first 100 characters plus `...`.
pub fn session_to_csv(session: &TestSession) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for result in &session.results {
        let score = result
            .similarity_score
            .map(|s| s.to_string())
            .unwrap_or_default();
        let generation_time = result
            .generation_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        let tokens = result
            .tokens_generated
            .map(|t| t.to_string())
            .unwrap_or_default();

        let row = [
            csv_escape(&result.question_id),
            csv_escape(&result.question_type),
            csv_escape(&truncate_question(&result.question_text)),
            csv_escape(&result.llm_response),
            csv_escape(result.actual_response.as_deref().unwrap_or("")),
            score,
            csv_escape(result.notes.as_deref().unwrap_or("")),
            result.reviewed.to_string(),
            generation_time,
            tokens,
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

fn truncate_question(text: &str) -> String {
    if text.chars().count() > QUESTION_PREFIX_CHARS {
        let prefix: String = text.chars().take(QUESTION_PREFIX_CHARS).collect();
        format!("{}...", prefix)
    } else {
        text.to_string()
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
