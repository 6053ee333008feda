//! Review workflow: walks a session's pending results, collects human
//! judgments, and writes each one back immediately.
//!
//! Each result is either pending (`reviewed == false`) or reviewed. The
//! workflow only ever visits pending results, in stored order, so invoking
//! it again on the same session resumes where the last pass stopped.

mod terminal;

pub use terminal::TerminalReviewSource;

use std::sync::Arc;

use tracing::info;

use crate::error::AppResult;
use crate::storage::{ResultUpdate, Storage, TestResult};

/// One human judgment for one result
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEntry {
    /// What the real person actually answered
    pub actual_response: String,
    /// Similarity judgment, guaranteed to be one of 1..=5
    pub similarity_score: u8,
    pub notes: Option<String>,
}

/// Supplies review judgments, one pending result at a time.
///
/// The interactive terminal is the normal implementation; tests script one.
/// Returning `Ok(None)` stops the pass early, leaving the remaining results
/// pending.
pub trait ReviewSource {
    /// Collect a judgment for `result`, shown as `position` of `total`.
    fn collect(
        &mut self,
        result: &TestResult,
        position: usize,
        total: usize,
    ) -> AppResult<Option<ReviewEntry>>;
}

/// Outcome of one review pass
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewSummary {
    /// No session has unreviewed results
    NoSessions,
    /// The requested session id does not exist
    NotFound { session_id: String },
    /// A pass over the session finished (or was stopped by the reviewer)
    Completed {
        session_id: String,
        /// Judgments saved during this pass
        newly_reviewed: usize,
        /// Results that were already reviewed before this pass
        already_reviewed: usize,
        /// Results still pending (nonzero only after an early stop)
        remaining: usize,
    },
}

/// Drives review passes against the session store
pub struct ReviewWorkflow {
    storage: Arc<dyn Storage>,
}

impl ReviewWorkflow {
    /// Create a workflow over a session store
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Review a session's pending results.
    ///
    /// With no id given, the first session (in store enumeration order) that
    /// still has unreviewed results is selected. Every collected judgment is
    /// persisted immediately through `update_result`, so a crash mid-pass
    /// loses nothing already entered.
    pub async fn review_session(
        &self,
        session_id: Option<&str>,
        source: &mut dyn ReviewSource,
    ) -> AppResult<ReviewSummary> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => match self.storage.unreviewed_ids().await?.into_iter().next() {
                Some(id) => id,
                None => return Ok(ReviewSummary::NoSessions),
            },
        };

        let Some(session) = self.storage.load(&session_id).await? else {
            return Ok(ReviewSummary::NotFound { session_id });
        };

        let total = session.results.len();
        let already_reviewed = session.reviewed_count();
        let mut newly_reviewed = 0;
        let mut stopped = false;

        for (index, result) in session.results.iter().enumerate() {
            if result.reviewed {
                continue;
            }

            let Some(entry) = source.collect(result, index + 1, total)? else {
                stopped = true;
                break;
            };

            let mut update = ResultUpdate::new()
                .with_actual_response(entry.actual_response)
                .with_similarity_score(entry.similarity_score);
            if let Some(notes) = entry.notes {
                update = update.with_notes(notes);
            }

            // Saved per question, not batched
            self.storage
                .update_result(&session_id, &result.test_id, update)
                .await?;
            newly_reviewed += 1;
        }

        let remaining = if stopped {
            total - already_reviewed - newly_reviewed
        } else {
            0
        };

        info!(
            session_id = %session_id,
            newly_reviewed,
            remaining,
            "Review pass finished"
        );

        Ok(ReviewSummary::Completed {
            session_id,
            newly_reviewed,
            already_reviewed,
            remaining,
        })
    }
}

/// Validate a raw similarity-score entry.
///
/// Accepts exactly the five allowed values; anything else (including
/// out-of-range numbers and non-numeric text) is rejected before storage
/// ever sees it.
pub fn parse_score(input: &str) -> Option<u8> {
    match input.trim().parse::<u8>() {
        Ok(score @ 1..=5) => Some(score),
        _ => None,
    }
}
