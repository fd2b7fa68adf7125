use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::ClientError;

/// Quiz difficulty levels accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(ClientError::Validation(format!(
                "unknown level '{other}', expected beginner, intermediate or advanced"
            ))),
        }
    }
}

/// Skill area a quiz concentrates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    Vocabulary,
    Reading,
    Listening,
    Speaking,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::Vocabulary => "Vocabulary",
            Focus::Reading => "Reading",
            Focus::Listening => "Listening",
            Focus::Speaking => "Speaking",
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Focus {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vocabulary" => Ok(Focus::Vocabulary),
            "reading" => Ok(Focus::Reading),
            "listening" => Ok(Focus::Listening),
            "speaking" => Ok(Focus::Speaking),
            other => Err(ClientError::Validation(format!(
                "unknown focus '{other}', expected Vocabulary, Reading, Listening or Speaking"
            ))),
        }
    }
}

/// Question counts the quiz form offers.
pub const ALLOWED_QUESTION_COUNTS: [u8; 3] = [5, 10, 15];

/// One quiz start request's worth of user input. Consumed once per start call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub level: Level,
    pub question_count: u8,
    pub focus: Focus,
}

impl QuizConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !ALLOWED_QUESTION_COUNTS.contains(&self.question_count) {
            return Err(ClientError::Validation(format!(
                "question count must be one of {:?}, got {}",
                ALLOWED_QUESTION_COUNTS, self.question_count
            )));
        }
        Ok(())
    }
}

/// Authenticated user as the backend describes it. Every field is optional;
/// responses routinely omit some of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, alias = "user_id", alias = "userId")]
    pub id: Option<String>,
    #[serde(default, alias = "fullName", alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "targetScore")]
    pub target_score: Option<u32>,
}

/// The authenticated identity: user plus bearer token.
///
/// Invariant: `token` is `None` iff the session is anonymous, and an absent
/// token always clears `user` too. `SessionStore` is the only writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user: Option<UserRecord>,
    pub token: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: Option<UserRecord>, token: String) -> Self {
        Self {
            user,
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.full_name.as_deref().or(u.email.as_deref()))
    }
}

/// What the durable slot actually holds: the identity plus a write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedIdentity {
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub token: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Signup form, serialized with the camelCase field names the backend expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_score: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// One selectable answer. For plain-string options label and value coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

/// Normalized question record, stable for the lifetime of one session.
///
/// Fallback ids (`q-{index}`) are positional and not stable across re-fetches;
/// nothing persisted may rely on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub skill: String,
    pub difficulty: Option<String>,
    pub options: Vec<Choice>,
}

/// One quiz attempt, alive from start to submit. A new start discards it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub session_id: String,
    pub level: Level,
    pub focus: Focus,
    /// The start response as received, kept for diagnostics.
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub skill: Option<String>,
    pub text: String,
}

/// Per-question grading detail from the submit response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_number: Option<u64>,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Graded outcome of one submit call. Immutable once produced; a resubmission
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub score: f64,
    pub total_questions: usize,
    pub correct_count: Option<u64>,
    pub feedback: Option<String>,
    pub recommendations: Vec<Recommendation>,
    /// Per-question breakdown; empty when the backend sends none.
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonStatus {
    Pending,
    InProgress,
    Done,
    Other(String),
}

impl LessonStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "" => LessonStatus::Pending,
            "in_progress" | "in-progress" | "inprogress" => LessonStatus::InProgress,
            "done" | "complete" | "completed" => LessonStatus::Done,
            _ => LessonStatus::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonStatus::Pending => f.write_str("pending"),
            LessonStatus::InProgress => f.write_str("in_progress"),
            LessonStatus::Done => f.write_str("done"),
            LessonStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Normalized lesson-plan entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonItem {
    pub id: String,
    pub title: String,
    pub skill: String,
    pub status: LessonStatus,
    pub next_action: Option<String>,
}

/// One past quiz attempt as the dashboard summary reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub session_id: String,
    pub date: String,
    pub level: String,
    pub score: f64,
}

/// Display-ready dashboard values, every field defaulted so the view renders
/// even from an empty summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub current_score: String,
    pub target_score: String,
    pub words_mastered: u64,
    pub streak: String,
    pub current_level: Option<String>,
    pub total_quizzes: u64,
    pub recent_history: Vec<HistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        let cases = vec![
            ("beginner", Level::Beginner),
            ("Beginner", Level::Beginner),
            ("INTERMEDIATE", Level::Intermediate),
            (" advanced ", Level::Advanced),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<Level>().unwrap(), expected, "input '{input}'");
        }
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn test_focus_parsing_and_wire_format() {
        assert_eq!("vocabulary".parse::<Focus>().unwrap(), Focus::Vocabulary);
        assert_eq!("Reading".parse::<Focus>().unwrap(), Focus::Reading);
        assert!("grammar".parse::<Focus>().is_err());

        // The backend expects PascalCase focus and lowercase level.
        assert_eq!(
            serde_json::to_value(Focus::Vocabulary).unwrap(),
            serde_json::json!("Vocabulary")
        );
        assert_eq!(
            serde_json::to_value(Level::Intermediate).unwrap(),
            serde_json::json!("intermediate")
        );
    }

    #[test]
    fn test_quiz_config_validation() {
        let mut config = QuizConfig {
            level: Level::Intermediate,
            question_count: 10,
            focus: Focus::Vocabulary,
        };
        assert!(config.validate().is_ok());

        config.question_count = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identity_authentication_invariant() {
        let anonymous = Identity::anonymous();
        assert!(!anonymous.is_authenticated());
        assert!(anonymous.user.is_none());

        let empty_token = Identity {
            user: None,
            token: Some(String::new()),
        };
        assert!(!empty_token.is_authenticated());

        let identity = Identity::authenticated(
            Some(UserRecord {
                full_name: Some("Ada".to_string()),
                ..Default::default()
            }),
            "tok-1".to_string(),
        );
        assert!(identity.is_authenticated());
        assert_eq!(identity.display_name(), Some("Ada"));
    }

    #[test]
    fn test_user_record_tolerates_camel_case_aliases() {
        let user: UserRecord = serde_json::from_value(serde_json::json!({
            "userId": "u-1",
            "fullName": "Ada Lovelace",
            "targetScore": 105
        }))
        .unwrap();
        assert_eq!(user.id.as_deref(), Some("u-1"));
        assert_eq!(user.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(user.target_score, Some(105));
        assert!(user.email.is_none());
    }

    #[test]
    fn test_signup_form_serializes_camel_case() {
        let form = SignupForm {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
            target_score: Some(100),
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["fullName"], "Ada Lovelace");
        assert_eq!(value["targetScore"], 100);
        assert!(value.get("full_name").is_none());
    }

    #[test]
    fn test_lesson_status_parsing() {
        assert_eq!(LessonStatus::parse("pending"), LessonStatus::Pending);
        assert_eq!(LessonStatus::parse("in-progress"), LessonStatus::InProgress);
        assert_eq!(LessonStatus::parse("Completed"), LessonStatus::Done);
        assert_eq!(
            LessonStatus::parse("deferred"),
            LessonStatus::Other("deferred".to_string())
        );
        assert_eq!(LessonStatus::parse(""), LessonStatus::Pending);
    }
}
