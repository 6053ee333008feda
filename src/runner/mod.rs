//! Test orchestration: drives one full session from persona/question files
//! to a persisted, completed [`TestSession`].

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::SamplingConfig;
use crate::error::AppResult;
use crate::ollama::OllamaClient;
use crate::persona::{Persona, Question, QuestionSet};
use crate::prompt::build_persona_prompt;
use crate::storage::{Storage, TestResult, TestSession};

/// Grouping key assigned when a question declares no type
pub const UNKNOWN_QUESTION_TYPE: &str = "unknown";

/// Orchestrates a test run: loads definitions, generates answers question by
/// question, and persists the session incrementally.
pub struct TestRunner {
    ollama: OllamaClient,
    storage: Arc<dyn Storage>,
}

impl TestRunner {
    /// Create a runner over a generation client and a session store
    pub fn new(ollama: OllamaClient, storage: Arc<dyn Storage>) -> Self {
        Self { ollama, storage }
    }

    /// Run a complete test session.
    ///
    /// Questions are generated strictly in source order, one blocking call
    /// each. The session is re-saved after every generated result, so a
    /// failure after N of M questions leaves N durable results with
    /// `completed = false`. Load and generation failures propagate; there is
    /// no retry.
    pub async fn run_test(
        &self,
        persona_file: impl AsRef<Path>,
        question_file: impl AsRef<Path>,
        model: &str,
        sampling: SamplingConfig,
        question_filter: Option<&[String]>,
    ) -> AppResult<TestSession> {
        let persona_file = persona_file.as_ref();
        let question_file = question_file.as_ref();

        // Both definitions load before any generation starts
        let persona = Persona::from_yaml_file(persona_file)?;
        let mut question_set = QuestionSet::from_yaml_file(question_file)?;

        if let Some(ids) = question_filter {
            question_set = question_set.filtered(ids);
        }

        let now = Utc::now();
        let session_id = new_session_id(&persona.id, model, now);

        let mut session = TestSession {
            session_id: session_id.clone(),
            persona_file: persona_file.display().to_string(),
            question_file: question_file.display().to_string(),
            model: model.to_string(),
            sampling: sampling.clone(),
            timestamp: now,
            completed: false,
            results: Vec::new(),
        };

        info!(
            session_id = %session_id,
            persona = %persona.id,
            model = %model,
            questions = question_set.questions.len(),
            "Starting test session"
        );

        // Record the session before the first generation so an early failure
        // still leaves a findable (empty, incomplete) record
        self.storage.save(&session).await?;

        let total = question_set.questions.len();
        for (index, question) in question_set.questions.iter().enumerate() {
            info!(
                question_id = %question.id,
                position = index + 1,
                total,
                "Generating answer"
            );

            let result = self
                .run_single_question(&persona, question, model, &sampling, &session_id)
                .await?;

            // Each result becomes durable the moment it exists
            session.results.push(result);
            self.storage.save(&session).await?;
        }

        session.completed = true;
        self.storage.save(&session).await?;

        info!(session_id = %session_id, results = session.results.len(), "Test session complete");

        Ok(session)
    }

    async fn run_single_question(
        &self,
        persona: &Persona,
        question: &Question,
        model: &str,
        sampling: &SamplingConfig,
        session_id: &str,
    ) -> AppResult<TestResult> {
        let question_text = question.full_text();
        let (system_prompt, user_prompt) = build_persona_prompt(persona, &question_text);

        let reply = self
            .ollama
            .generate(model, &user_prompt, sampling, Some(&system_prompt))
            .await?;

        if reply.text.is_empty() {
            warn!(question_id = %question.id, "Model returned an empty answer");
        }

        Ok(TestResult {
            test_id: format!("{}_{}", session_id, question.id),
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            question_id: question.id.clone(),
            question_text,
            question_type: question
                .question_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_QUESTION_TYPE.to_string()),
            llm_response: reply.text,
            model: model.to_string(),
            sampling: sampling.clone(),
            timestamp: reply.timestamp,
            generation_time: Some(reply.generation_time.as_secs_f64()),
            tokens_generated: reply.tokens_generated,
            actual_response: None,
            similarity_score: None,
            notes: None,
            reviewed: false,
        })
    }
}

/// Build a session id from persona, model, and creation time.
///
/// Colons in model tags become underscores so the id stays filesystem-safe;
/// the second-precision timestamp keeps ids lexically sortable per
/// persona/model pair, and the random suffix keeps two runs within the same
/// second from colliding.
fn new_session_id(persona_id: &str, model: &str, timestamp: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}",
        persona_id,
        sanitize_model_tag(model),
        timestamp.format("%Y%m%d_%H%M%S"),
        &suffix[..6]
    )
}

fn sanitize_model_tag(model: &str) -> String {
    model.replace([':', '/'], "_")
}
