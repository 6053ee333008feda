//! Session store: the data model for test sessions and their durable,
//! file-per-session persistence.
//!
//! The store owns the canonical on-disk representation. In-memory sessions
//! are transient copies; every mutation goes back through [`Storage`] to
//! become durable. Review data has exactly one mutation path,
//! [`Storage::update_result`], which is idempotent by construction.

mod json;

pub use json::JsonFileStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SamplingConfig;
use crate::error::StorageResult;

/// One question/answer unit within a session.
///
/// Everything except the review fields is fixed at creation time. The
/// sampling snapshot is the exact value used for the call, so later preset
/// changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Stable identity: `{session_id}_{question_id}`.
    pub test_id: String,
    pub persona_id: String,
    pub persona_name: String,
    pub question_id: String,
    pub question_text: String,
    /// Literal grouping key; "unknown" when the source omitted a type.
    pub question_type: String,
    pub llm_response: String,
    pub model: String,
    pub sampling: SamplingConfig,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock generation latency in seconds
    pub generation_time: Option<f64>,
    pub tokens_generated: Option<u32>,
    /// Ground truth from the real person, filled in at review time
    pub actual_response: Option<String>,
    /// Human similarity judgment, 1..=5
    pub similarity_score: Option<u8>,
    pub notes: Option<String>,
    pub reviewed: bool,
}

impl TestResult {
    /// Whether this result counts toward accuracy metrics.
    ///
    /// A stale score on an unreviewed result does not count.
    pub fn has_reviewed_score(&self) -> bool {
        self.reviewed && self.similarity_score.is_some()
    }
}

/// A complete test run: one persona, one question set, one model/config.
///
/// The result list is fixed once the run completes; review fields inside
/// each result stay mutable indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    /// Globally unique, filesystem-safe id, lexically sortable by creation
    /// time within one persona/model pair.
    pub session_id: String,
    pub persona_file: String,
    pub question_file: String,
    pub model: String,
    pub sampling: SamplingConfig,
    pub timestamp: DateTime<Utc>,
    /// Set once every question in the run has been attempted; independent of
    /// review state.
    pub completed: bool,
    pub results: Vec<TestResult>,
}

impl TestSession {
    /// Number of results still awaiting review
    pub fn unreviewed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.reviewed).count()
    }

    /// Number of reviewed results
    pub fn reviewed_count(&self) -> usize {
        self.results.iter().filter(|r| r.reviewed).count()
    }

    /// Whether any result is still awaiting review
    pub fn has_unreviewed(&self) -> bool {
        self.results.iter().any(|r| !r.reviewed)
    }
}

/// Partial update to one result's review fields.
///
/// Only `Some` fields are applied; omitted fields are left untouched.
/// `reviewed` defaults to `true` on apply unless explicitly overridden.
#[derive(Debug, Clone, Default)]
pub struct ResultUpdate {
    pub actual_response: Option<String>,
    pub similarity_score: Option<u8>,
    pub notes: Option<String>,
    pub reviewed: Option<bool>,
}

impl ResultUpdate {
    /// Start an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ground-truth response
    pub fn with_actual_response(mut self, actual_response: impl Into<String>) -> Self {
        self.actual_response = Some(actual_response.into());
        self
    }

    /// Set the similarity score
    pub fn with_similarity_score(mut self, score: u8) -> Self {
        self.similarity_score = Some(score);
        self
    }

    /// Set the reviewer notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Explicitly override the reviewed flag
    pub fn with_reviewed(mut self, reviewed: bool) -> Self {
        self.reviewed = Some(reviewed);
        self
    }

    fn apply(&self, result: &mut TestResult) {
        if let Some(actual_response) = &self.actual_response {
            result.actual_response = Some(actual_response.clone());
        }
        if let Some(score) = self.similarity_score {
            result.similarity_score = Some(score);
        }
        if let Some(notes) = &self.notes {
            result.notes = Some(notes.clone());
        }
        result.reviewed = self.reviewed.unwrap_or(true);
    }
}

/// Durable session persistence, keyed by session id.
///
/// Whole-record read-modify-write with no locking: concurrent writers to the
/// same session id race and the last writer wins. Callers must keep a single
/// writer per session.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Serialize the full session to durable storage, overwriting any
    /// existing record for its id.
    async fn save(&self, session: &TestSession) -> StorageResult<()>;

    /// Reconstruct a session from storage; `None` when no record exists.
    async fn load(&self, session_id: &str) -> StorageResult<Option<TestSession>>;

    /// Enumerate all persisted session ids in stable (lexical) order.
    async fn list_ids(&self) -> StorageResult<Vec<String>>;

    /// Session ids that still have at least one unreviewed result, in
    /// enumeration order.
    async fn unreviewed_ids(&self) -> StorageResult<Vec<String>> {
        let mut unreviewed = Vec::new();
        for session_id in self.list_ids().await? {
            if let Some(session) = self.load(&session_id).await? {
                if session.has_unreviewed() {
                    unreviewed.push(session_id);
                }
            }
        }
        Ok(unreviewed)
    }

    /// Apply a partial review update to one result and re-save the session.
    ///
    /// Returns `false` (with storage untouched) when the session or result
    /// does not exist. Idempotent: re-applying the same update yields the
    /// same stored state.
    async fn update_result(
        &self,
        session_id: &str,
        test_id: &str,
        update: ResultUpdate,
    ) -> StorageResult<bool> {
        let Some(mut session) = self.load(session_id).await? else {
            return Ok(false);
        };

        let Some(result) = session.results.iter_mut().find(|r| r.test_id == test_id) else {
            return Ok(false);
        };

        update.apply(result);
        self.save(&session).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SamplingConfig, SamplingPreset};

    fn sample_result(test_id: &str) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            persona_id: "p1".to_string(),
            persona_name: "Pat".to_string(),
            question_id: "q1".to_string(),
            question_text: "Would you?".to_string(),
            question_type: "preference".to_string(),
            llm_response: "Probably.".to_string(),
            model: "llama3:8b".to_string(),
            sampling: SamplingConfig::preset(SamplingPreset::Balanced),
            timestamp: Utc::now(),
            generation_time: Some(2.5),
            tokens_generated: Some(42),
            actual_response: None,
            similarity_score: None,
            notes: None,
            reviewed: false,
        }
    }

    #[test]
    fn test_stale_score_needs_reviewed_flag() {
        let mut result = sample_result("t1");
        result.similarity_score = Some(4);
        assert!(!result.has_reviewed_score());

        result.reviewed = true;
        assert!(result.has_reviewed_score());
    }

    #[test]
    fn test_update_applies_only_provided_fields() {
        let mut result = sample_result("t1");
        result.notes = Some("earlier note".to_string());

        ResultUpdate::new()
            .with_actual_response("I would not.")
            .with_similarity_score(2)
            .apply(&mut result);

        assert_eq!(result.actual_response.as_deref(), Some("I would not."));
        assert_eq!(result.similarity_score, Some(2));
        // Omitted field left untouched
        assert_eq!(result.notes.as_deref(), Some("earlier note"));
        // Reviewed forced on by default
        assert!(result.reviewed);
    }

    #[test]
    fn test_update_reviewed_override() {
        let mut result = sample_result("t1");
        ResultUpdate::new().with_reviewed(false).apply(&mut result);
        assert!(!result.reviewed);
    }

    #[test]
    fn test_session_counts() {
        let mut session = TestSession {
            session_id: "s1".to_string(),
            persona_file: "p.yaml".to_string(),
            question_file: "q.yaml".to_string(),
            model: "llama3:8b".to_string(),
            sampling: SamplingConfig::default(),
            timestamp: Utc::now(),
            completed: true,
            results: vec![sample_result("t1"), sample_result("t2")],
        };

        assert_eq!(session.unreviewed_count(), 2);
        assert!(session.has_unreviewed());

        session.results[0].reviewed = true;
        assert_eq!(session.unreviewed_count(), 1);
        assert_eq!(session.reviewed_count(), 1);
    }
}
