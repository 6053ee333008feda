//! End-to-end orchestration tests
//!
//! Drives `TestRunner` against a mocked Ollama service and a temporary
//! session store, with persona/question definitions written as fixtures.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use persona_bench::config::{OllamaConfig, RequestConfig, SamplingConfig, SamplingPreset};
use persona_bench::error::AppError;
use persona_bench::ollama::OllamaClient;
use persona_bench::runner::TestRunner;
use persona_bench::storage::{JsonFileStorage, Storage};

const PERSONA_YAML: &str = r#"
id: alex_chen
name: Alex Chen
personality:
  traits: [frugal]
"#;

const QUESTIONS_YAML: &str = r#"
questions:
  - id: q1
    question: Which laptop would you buy?
    type: purchase
  - id: q2
    question: Would you pay for cloud storage?
    type: preference
    follow_up: What monthly price feels fair?
  - id: q3
    question: Describe your ideal weekend.
  - id: q4
    question: Do you tip at coffee shops?
    type: habit
  - id: q5
    question: Would you lease or buy a car?
    type: purchase
"#;

struct Fixture {
    _dir: TempDir,
    persona_file: PathBuf,
    question_file: PathBuf,
    storage: Arc<JsonFileStorage>,
}

fn write_fixture() -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let persona_file = dir.path().join("persona.yaml");
    fs::write(&persona_file, PERSONA_YAML).unwrap();

    let question_file = dir.path().join("questions.yaml");
    fs::write(&question_file, QUESTIONS_YAML).unwrap();

    let results_dir = dir.path().join("results");
    let storage = Arc::new(JsonFileStorage::new(&results_dir).unwrap());

    Fixture {
        _dir: dir,
        persona_file,
        question_file,
        storage,
    }
}

fn create_test_client(base_url: &str) -> OllamaClient {
    let config = OllamaConfig {
        base_url: base_url.to_string(),
    };
    let request_config = RequestConfig {
        generate_timeout: Duration::from_secs(5),
        pull_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(5),
    };
    OllamaClient::new(&config, request_config).unwrap()
}

async fn mock_generate_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "As Alex, I'd go with the practical option.",
            "eval_count": 41
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_test_full_session() {
    let mock_server = MockServer::start().await;
    mock_generate_ok(&mock_server).await;

    let fixture = write_fixture();
    let runner = TestRunner::new(
        create_test_client(&mock_server.uri()),
        fixture.storage.clone(),
    );
    let sampling = SamplingConfig::preset(SamplingPreset::Precise);

    let session = runner
        .run_test(
            &fixture.persona_file,
            &fixture.question_file,
            "llama3:8b",
            sampling.clone(),
            None,
        )
        .await
        .expect("run should succeed");

    assert!(session.completed);
    assert_eq!(session.results.len(), 5);
    assert!(session.session_id.starts_with("alex_chen_llama3_8b_"));

    // Results keep source order and derive stable identities
    let first = &session.results[0];
    assert_eq!(first.test_id, format!("{}_q1", session.session_id));
    assert_eq!(first.question_type, "purchase");
    assert_eq!(first.persona_name, "Alex Chen");
    assert_eq!(first.llm_response, "As Alex, I'd go with the practical option.");
    assert_eq!(first.tokens_generated, Some(41));
    assert!(first.generation_time.unwrap() > 0.0);
    assert!(!first.reviewed);

    // Sampling snapshot travels with every result
    assert_eq!(first.sampling, sampling);

    // Follow-up is folded into the question text
    assert!(session.results[1]
        .question_text
        .contains("What monthly price feels fair?"));

    // A question without a declared type lands in the unknown bucket
    assert_eq!(session.results[2].question_type, "unknown");

    // The persisted record round-trips to the same session
    let stored = fixture
        .storage
        .load(&session.session_id)
        .await
        .unwrap()
        .expect("session persisted");
    assert_eq!(stored, session);
}

#[tokio::test]
async fn test_run_test_question_filter() {
    let mock_server = MockServer::start().await;
    mock_generate_ok(&mock_server).await;

    let fixture = write_fixture();
    let runner = TestRunner::new(
        create_test_client(&mock_server.uri()),
        fixture.storage.clone(),
    );

    let session = runner
        .run_test(
            &fixture.persona_file,
            &fixture.question_file,
            "llama3:8b",
            SamplingConfig::default(),
            Some(&["q3".to_string(), "q99".to_string()]),
        )
        .await
        .unwrap();

    // One of five matched; the unknown id dropped silently
    assert_eq!(session.results.len(), 1);
    assert_eq!(session.results[0].question_id, "q3");
}

#[tokio::test]
async fn test_run_test_missing_persona_fails_before_generation() {
    let mock_server = MockServer::start().await;
    // Any generate call would violate the load-before-generate contract
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "x" })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let fixture = write_fixture();
    let runner = TestRunner::new(
        create_test_client(&mock_server.uri()),
        fixture.storage.clone(),
    );

    let result = runner
        .run_test(
            fixture._dir.path().join("missing.yaml"),
            &fixture.question_file,
            "llama3:8b",
            SamplingConfig::default(),
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::Loader(_))));
    assert!(fixture.storage.list_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mid_run_failure_keeps_generated_results() {
    let mock_server = MockServer::start().await;

    // First call succeeds, everything after fails
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "First answer.",
            "eval_count": 12
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&mock_server)
        .await;

    let fixture = write_fixture();
    let runner = TestRunner::new(
        create_test_client(&mock_server.uri()),
        fixture.storage.clone(),
    );

    let result = runner
        .run_test(
            &fixture.persona_file,
            &fixture.question_file,
            "llama3:8b",
            SamplingConfig::default(),
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::Ollama(_))));

    // The one generated answer survived the abort
    let ids = fixture.storage.list_ids().await.unwrap();
    assert_eq!(ids.len(), 1);
    let session = fixture.storage.load(&ids[0]).await.unwrap().unwrap();
    assert!(!session.completed);
    assert_eq!(session.results.len(), 1);
    assert_eq!(session.results[0].llm_response, "First answer.");
}

#[tokio::test]
async fn test_two_runs_same_second_get_distinct_sessions() {
    let mock_server = MockServer::start().await;
    mock_generate_ok(&mock_server).await;

    let fixture = write_fixture();
    let runner = TestRunner::new(
        create_test_client(&mock_server.uri()),
        fixture.storage.clone(),
    );

    let filter = ["q1".to_string()];
    let first = runner
        .run_test(
            &fixture.persona_file,
            &fixture.question_file,
            "llama3:8b",
            SamplingConfig::default(),
            Some(&filter),
        )
        .await
        .unwrap();
    let second = runner
        .run_test(
            &fixture.persona_file,
            &fixture.question_file,
            "llama3:8b",
            SamplingConfig::default(),
            Some(&filter),
        )
        .await
        .unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(fixture.storage.list_ids().await.unwrap().len(), 2);
}
