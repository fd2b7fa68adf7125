use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::ClientError;
use crate::models::{Question, QuizConfig, QuizSession, SubmissionResult};
use crate::normalize;

/// Where one quiz attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    Idle,
    Starting,
    Active,
    Submitting,
    Completed,
}

/// Drives one quiz attempt: start → collect answers → submit.
///
/// Starting a new quiz from any phase discards the previous session, its
/// answers and its result. A failed start leaves no partial session behind;
/// the phase drops back to `Idle` and the error message goes to the caller.
#[derive(Debug)]
pub struct QuizService {
    client: ApiClient,
    user_id: String,
    phase: QuizPhase,
    session: Option<QuizSession>,
    questions: Vec<Question>,
    answers: HashMap<String, String>,
    result: Option<SubmissionResult>,
}

impl QuizService {
    pub fn new(client: ApiClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            phase: QuizPhase::Idle,
            session: None,
            questions: Vec::new(),
            answers: HashMap::new(),
            result: None,
        }
    }

    pub fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|v| !v.is_empty()).count()
    }

    /// True only when every question of a non-empty session has an answer.
    pub fn all_answered(&self) -> bool {
        !self.questions.is_empty() && self.answered_count() == self.questions.len()
    }

    fn reset(&mut self) {
        self.phase = QuizPhase::Idle;
        self.session = None;
        self.questions.clear();
        self.answers.clear();
        self.result = None;
    }

    /// Start a fresh attempt. On success the session is `Active` with every
    /// question id mapped to an empty answer.
    pub async fn start_quiz(&mut self, config: &QuizConfig) -> Result<(), ClientError> {
        config.validate()?;
        self.reset();
        self.phase = QuizPhase::Starting;

        match self.begin(config).await {
            Ok(()) => {
                self.phase = QuizPhase::Active;
                info!(
                    session_id = %self.session.as_ref().map(|s| s.session_id.as_str()).unwrap_or(""),
                    question_count = self.questions.len(),
                    level = %config.level,
                    focus = %config.focus,
                    "quiz session active"
                );
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "quiz start failed, discarding partial session");
                self.reset();
                Err(err)
            }
        }
    }

    async fn begin(&mut self, config: &QuizConfig) -> Result<(), ClientError> {
        let body = json!({
            "user_id": self.user_id,
            "level": config.level,
            "question_count": config.question_count,
            "focus": config.focus,
        });
        let response = self.client.post("/api/quiz/start", None, Some(&body)).await?;

        let session_id = normalize::first_string(&response, normalize::SESSION_ID_ALIASES)
            .ok_or_else(|| {
                ClientError::Request("quiz start response carried no session id".to_string())
            })?;

        // The start response may already embed the questions; only fall back
        // to the dedicated endpoint when it does not. A null field counts as
        // absent.
        let questions = if normalize::first(&response, &["questions"]).is_some() {
            normalize::normalize_questions(&response, config.focus.as_str())
        } else {
            let fetched = self
                .client
                .get(&format!("/api/quiz/questions/{session_id}"), None)
                .await?;
            normalize::normalize_questions(&fetched, config.focus.as_str())
        };

        if questions.is_empty() {
            return Err(ClientError::Request(
                "quiz session has no questions".to_string(),
            ));
        }

        self.answers = questions
            .iter()
            .map(|q| (q.id.clone(), String::new()))
            .collect();
        self.questions = questions;
        self.session = Some(QuizSession {
            session_id,
            level: config.level,
            focus: config.focus,
            raw: response,
        });
        Ok(())
    }

    /// Record (or overwrite) the selected value for a question. The id is not
    /// checked against the session; callers are expected to pass ids they got
    /// from `questions()`.
    pub fn record_answer(&mut self, question_id: &str, value: &str) {
        if self.phase != QuizPhase::Active {
            warn!(phase = ?self.phase, question_id, "answer recorded outside an active quiz, ignoring");
            return;
        }
        self.answers
            .insert(question_id.to_string(), value.to_string());
    }

    /// Submit the attempt. Answers go out as a positional array in question
    /// order — the backend matches them up by index, so reordering questions
    /// between fetch and submit would silently misgrade. Submission is not
    /// blocked on `all_answered`; honoring that gate is the caller's job.
    ///
    /// On failure the session stays `Active` with answers intact, so the
    /// caller can retry.
    pub async fn submit_quiz(&mut self) -> Result<SubmissionResult, ClientError> {
        let session_id = self
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
            .ok_or_else(|| ClientError::Validation("no quiz session to submit".to_string()))?;

        let answers: Vec<String> = self
            .questions
            .iter()
            .map(|q| self.answers.get(&q.id).cloned().unwrap_or_default())
            .collect();

        self.phase = QuizPhase::Submitting;
        let body = json!({
            "session_id": session_id,
            "user_id": self.user_id,
            "answers": answers,
        });

        match self.client.post("/api/quiz/submit", None, Some(&body)).await {
            Ok(response) => {
                let result = normalize::normalize_submission(&response);
                info!(
                    session_id = %session_id,
                    score = result.score,
                    total_questions = result.total_questions,
                    "quiz submitted"
                );
                self.result = Some(result.clone());
                self.phase = QuizPhase::Completed;
                Ok(result)
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "quiz submit failed, answers preserved");
                self.phase = QuizPhase::Active;
                Err(err)
            }
        }
    }
}
