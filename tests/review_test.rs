//! Review workflow tests
//!
//! Uses a scripted `ReviewSource` in place of the terminal to exercise the
//! resume-safe, save-per-question state machine.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use persona_bench::config::SamplingConfig;
use persona_bench::error::AppResult;
use persona_bench::review::{ReviewEntry, ReviewSource, ReviewSummary, ReviewWorkflow};
use persona_bench::storage::{JsonFileStorage, Storage, TestResult, TestSession};

/// Scripted reviewer: hands out queued entries, `None` when exhausted
struct ScriptedSource {
    entries: Vec<Option<ReviewEntry>>,
    calls: usize,
}

impl ScriptedSource {
    fn new(entries: Vec<Option<ReviewEntry>>) -> Self {
        Self { entries, calls: 0 }
    }
}

impl ReviewSource for ScriptedSource {
    fn collect(
        &mut self,
        _result: &TestResult,
        _position: usize,
        _total: usize,
    ) -> AppResult<Option<ReviewEntry>> {
        let entry = if self.calls < self.entries.len() {
            self.entries[self.calls].clone()
        } else {
            None
        };
        self.calls += 1;
        Ok(entry)
    }
}

fn entry(actual: &str, score: u8) -> Option<ReviewEntry> {
    Some(ReviewEntry {
        actual_response: actual.to_string(),
        similarity_score: score,
        notes: None,
    })
}

fn pending_result(session_id: &str, question_id: &str) -> TestResult {
    TestResult {
        test_id: format!("{}_{}", session_id, question_id),
        persona_id: "alex_chen".to_string(),
        persona_name: "Alex Chen".to_string(),
        question_id: question_id.to_string(),
        question_text: "Which laptop would you buy?".to_string(),
        question_type: "purchase".to_string(),
        llm_response: "A refurbished ThinkPad.".to_string(),
        model: "llama3:8b".to_string(),
        sampling: SamplingConfig::default(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        generation_time: Some(2.0),
        tokens_generated: Some(40),
        actual_response: None,
        similarity_score: None,
        notes: None,
        reviewed: false,
    }
}

async fn store_with_session(question_ids: &[&str]) -> (TempDir, Arc<JsonFileStorage>) {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(JsonFileStorage::new(dir.path()).unwrap());

    let session = TestSession {
        session_id: "s1".to_string(),
        persona_file: "personas/alex.yaml".to_string(),
        question_file: "questions/shopping.yaml".to_string(),
        model: "llama3:8b".to_string(),
        sampling: SamplingConfig::default(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        completed: true,
        results: question_ids
            .iter()
            .map(|q| pending_result("s1", q))
            .collect(),
    };
    storage.save(&session).await.unwrap();

    (dir, storage)
}

#[tokio::test]
async fn test_full_review_pass_saves_every_judgment() {
    let (_dir, storage) = store_with_session(&["q1", "q2"]).await;
    let workflow = ReviewWorkflow::new(storage.clone());

    let mut source = ScriptedSource::new(vec![entry("Real answer one.", 4), entry("Real answer two.", 2)]);
    let summary = workflow.review_session(Some("s1"), &mut source).await.unwrap();

    assert_eq!(
        summary,
        ReviewSummary::Completed {
            session_id: "s1".to_string(),
            newly_reviewed: 2,
            already_reviewed: 0,
            remaining: 0,
        }
    );

    let session = storage.load("s1").await.unwrap().unwrap();
    assert!(session.results.iter().all(|r| r.reviewed));
    assert_eq!(session.results[0].similarity_score, Some(4));
    assert_eq!(
        session.results[1].actual_response.as_deref(),
        Some("Real answer two.")
    );
}

#[tokio::test]
async fn test_second_pass_processes_zero_questions() {
    let (_dir, storage) = store_with_session(&["q1", "q2"]).await;
    let workflow = ReviewWorkflow::new(storage.clone());

    let mut first = ScriptedSource::new(vec![entry("One.", 5), entry("Two.", 5)]);
    workflow.review_session(Some("s1"), &mut first).await.unwrap();
    let after_first = storage.load("s1").await.unwrap().unwrap();

    let mut second = ScriptedSource::new(vec![entry("Would clobber.", 1)]);
    let summary = workflow.review_session(Some("s1"), &mut second).await.unwrap();

    assert_eq!(
        summary,
        ReviewSummary::Completed {
            session_id: "s1".to_string(),
            newly_reviewed: 0,
            already_reviewed: 2,
            remaining: 0,
        }
    );
    // The scripted source was never consulted
    assert_eq!(second.calls, 0);

    // Prior answers untouched
    let after_second = storage.load("s1").await.unwrap().unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_early_stop_preserves_partial_progress() {
    let (_dir, storage) = store_with_session(&["q1", "q2", "q3"]).await;
    let workflow = ReviewWorkflow::new(storage.clone());

    let mut source = ScriptedSource::new(vec![entry("Only this one.", 3), None]);
    let summary = workflow.review_session(Some("s1"), &mut source).await.unwrap();

    assert_eq!(
        summary,
        ReviewSummary::Completed {
            session_id: "s1".to_string(),
            newly_reviewed: 1,
            already_reviewed: 0,
            remaining: 2,
        }
    );

    // The judgment collected before the stop is durable
    let session = storage.load("s1").await.unwrap().unwrap();
    assert!(session.results[0].reviewed);
    assert!(!session.results[1].reviewed);
    assert!(!session.results[2].reviewed);

    // Resuming picks up exactly the pending tail
    let mut resume = ScriptedSource::new(vec![entry("Second.", 2), entry("Third.", 1)]);
    let summary = workflow.review_session(Some("s1"), &mut resume).await.unwrap();
    assert_eq!(
        summary,
        ReviewSummary::Completed {
            session_id: "s1".to_string(),
            newly_reviewed: 2,
            already_reviewed: 1,
            remaining: 0,
        }
    );
}

#[tokio::test]
async fn test_auto_select_picks_first_unreviewed_session() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(JsonFileStorage::new(dir.path()).unwrap());

    // "a_done" is fully reviewed, "b_pending" is not; enumeration order is
    // lexical, so auto-select must land on "b_pending"
    let mut done = TestSession {
        session_id: "a_done".to_string(),
        persona_file: "personas/alex.yaml".to_string(),
        question_file: "questions/shopping.yaml".to_string(),
        model: "llama3:8b".to_string(),
        sampling: SamplingConfig::default(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        completed: true,
        results: vec![pending_result("a_done", "q1")],
    };
    done.results[0].reviewed = true;
    storage.save(&done).await.unwrap();

    let pending = TestSession {
        session_id: "b_pending".to_string(),
        results: vec![pending_result("b_pending", "q1")],
        ..done.clone()
    };
    storage.save(&pending).await.unwrap();

    let workflow = ReviewWorkflow::new(storage.clone());
    let mut source = ScriptedSource::new(vec![entry("Answer.", 5)]);
    let summary = workflow.review_session(None, &mut source).await.unwrap();

    match summary {
        ReviewSummary::Completed { session_id, .. } => assert_eq!(session_id, "b_pending"),
        other => panic!("unexpected summary: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_unreviewed_sessions() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(JsonFileStorage::new(dir.path()).unwrap());
    let workflow = ReviewWorkflow::new(storage);

    let mut source = ScriptedSource::new(vec![]);
    let summary = workflow.review_session(None, &mut source).await.unwrap();
    assert_eq!(summary, ReviewSummary::NoSessions);
}

#[tokio::test]
async fn test_unknown_session_id() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(JsonFileStorage::new(dir.path()).unwrap());
    let workflow = ReviewWorkflow::new(storage);

    let mut source = ScriptedSource::new(vec![]);
    let summary = workflow.review_session(Some("ghost"), &mut source).await.unwrap();
    assert_eq!(
        summary,
        ReviewSummary::NotFound {
            session_id: "ghost".to_string()
        }
    );
}
