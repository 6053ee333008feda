//! Analytics over reviewed sessions: summary reports, cross-session
//! comparison, and CSV/JSON export.
//!
//! Accuracy metrics only ever see results that are reviewed with a score;
//! performance metrics (latency, tokens) deliberately cover every result
//! that has a value, reviewed or not.

mod export;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::storage::{Storage, TestSession};

/// Highest possible similarity score; accuracy is the mean scaled against it
const MAX_SCORE: f64 = 5.0;

/// Report for one session, or the explicit marker that nothing has been
/// reviewed yet. Callers must branch rather than treat "no reviews" as zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The session exists but has no reviewed, scored results
    NoReviews {
        session_id: String,
    },
    Report(SessionReport),
}

/// Aggregated metrics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub model: String,
    pub persona_file: String,
    pub timestamp: DateTime<Utc>,
    pub total_questions: usize,
    pub reviewed_questions: usize,
    pub overall: OverallMetrics,
    /// Mean score per literal question-type string
    pub by_question_type: BTreeMap<String, f64>,
    pub performance: PerformanceMetrics,
    pub question_breakdown: Vec<BreakdownRow>,
}

/// Similarity statistics over reviewed, scored results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub average_similarity: f64,
    pub min_similarity: u8,
    pub max_similarity: u8,
    /// `average_similarity / 5.0 * 100`
    pub accuracy_percentage: f64,
}

/// Latency and token statistics over all results carrying values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub avg_generation_time_secs: f64,
    pub avg_tokens_generated: f64,
}

/// One reviewed result in the report's per-question listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub question_id: String,
    pub question_type: String,
    pub similarity_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One session's summary row in a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub session_id: String,
    pub model: String,
    pub average_similarity: f64,
    pub accuracy_percentage: f64,
    pub avg_generation_time_secs: f64,
    pub reviewed_questions: usize,
    pub total_questions: usize,
}

/// Cross-session comparison. Sessions without a single review are dropped,
/// not reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    /// Index into `rows` of the highest mean similarity (first on ties)
    pub best_accuracy: Option<usize>,
    /// Index into `rows` of the lowest mean generation time (first on ties)
    pub fastest: Option<usize>,
}

impl Comparison {
    /// Row with the best accuracy, when any row exists
    pub fn best_accuracy_row(&self) -> Option<&ComparisonRow> {
        self.best_accuracy.and_then(|i| self.rows.get(i))
    }

    /// Row with the lowest mean generation time, when any row exists
    pub fn fastest_row(&self) -> Option<&ComparisonRow> {
        self.fastest.and_then(|i| self.rows.get(i))
    }
}

/// Analytics engine over the session store
pub struct Analytics {
    storage: Arc<dyn Storage>,
}

impl Analytics {
    /// Create an engine over a session store
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Generate the report for one session.
    ///
    /// `None` when the session does not exist;
    /// [`ReportOutcome::NoReviews`] when it has no reviewed, scored results.
    pub async fn generate_report(&self, session_id: &str) -> AppResult<Option<ReportOutcome>> {
        let Some(session) = self.storage.load(session_id).await? else {
            return Ok(None);
        };
        Ok(Some(report_for(&session)))
    }

    /// Build comparison rows for every listed session that has at least one
    /// review. Missing and unreviewed sessions are silently dropped.
    pub async fn compare(&self, session_ids: &[String]) -> AppResult<Comparison> {
        let mut rows = Vec::new();

        for session_id in session_ids {
            let Some(outcome) = self.generate_report(session_id).await? else {
                continue;
            };
            if let ReportOutcome::Report(report) = outcome {
                rows.push(ComparisonRow {
                    session_id: report.session_id,
                    model: report.model,
                    average_similarity: report.overall.average_similarity,
                    accuracy_percentage: report.overall.accuracy_percentage,
                    avg_generation_time_secs: report.performance.avg_generation_time_secs,
                    reviewed_questions: report.reviewed_questions,
                    total_questions: report.total_questions,
                });
            }
        }

        // Stable argmax/argmin: strict comparisons keep the first of a tie
        let mut best_accuracy = None;
        let mut fastest = None;
        for (index, row) in rows.iter().enumerate() {
            match best_accuracy {
                None => best_accuracy = Some(index),
                Some(best) if row.average_similarity > rows[best].average_similarity => {
                    best_accuracy = Some(index)
                }
                _ => {}
            }
            match fastest {
                None => fastest = Some(index),
                Some(min)
                    if row.avg_generation_time_secs < rows[min].avg_generation_time_secs =>
                {
                    fastest = Some(index)
                }
                _ => {}
            }
        }

        Ok(Comparison {
            rows,
            best_accuracy,
            fastest,
        })
    }
}

/// Compute the report for an already-loaded session
pub fn report_for(session: &TestSession) -> ReportOutcome {
    let reviewed: Vec<_> = session
        .results
        .iter()
        .filter(|r| r.has_reviewed_score())
        .collect();

    if reviewed.is_empty() {
        return ReportOutcome::NoReviews {
            session_id: session.session_id.clone(),
        };
    }

    let scores: Vec<u8> = reviewed
        .iter()
        .filter_map(|r| r.similarity_score)
        .collect();
    let average_similarity = mean(scores.iter().map(|&s| f64::from(s)));
    let overall = OverallMetrics {
        average_similarity,
        min_similarity: scores.iter().copied().min().unwrap_or(0),
        max_similarity: scores.iter().copied().max().unwrap_or(0),
        accuracy_percentage: average_similarity / MAX_SCORE * 100.0,
    };

    let mut scores_by_type: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for result in &reviewed {
        if let Some(score) = result.similarity_score {
            scores_by_type
                .entry(result.question_type.clone())
                .or_default()
                .push(f64::from(score));
        }
    }
    let by_question_type = scores_by_type
        .into_iter()
        .map(|(question_type, scores)| {
            let type_mean = mean(scores.iter().copied());
            (question_type, type_mean)
        })
        .collect();

    // Averages over every result that carries a value, reviewed or not
    let performance = PerformanceMetrics {
        avg_generation_time_secs: mean(
            session.results.iter().filter_map(|r| r.generation_time),
        ),
        avg_tokens_generated: mean(
            session
                .results
                .iter()
                .filter_map(|r| r.tokens_generated.map(f64::from)),
        ),
    };

    let question_breakdown = reviewed
        .iter()
        .filter_map(|r| {
            r.similarity_score.map(|similarity_score| BreakdownRow {
                question_id: r.question_id.clone(),
                question_type: r.question_type.clone(),
                similarity_score,
                notes: r.notes.clone(),
            })
        })
        .collect();

    ReportOutcome::Report(SessionReport {
        session_id: session.session_id.clone(),
        model: session.model.clone(),
        persona_file: session.persona_file.clone(),
        timestamp: session.timestamp,
        total_questions: session.results.len(),
        reviewed_questions: reviewed.len(),
        overall,
        by_question_type,
        performance,
        question_breakdown,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub use export::session_to_csv;
