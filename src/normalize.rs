use serde_json::Value;
use tracing::debug;

use crate::models::{
    Choice, HistoryItem, LessonItem, LessonStatus, Question, QuestionResult, Recommendation,
    SubmissionResult,
};

/// Ordered alias tables for the backend's not-quite-pinned-down schema.
///
/// Every lookup walks its table front to back and takes the first present,
/// non-null value, so behavior is deterministic for any fixed payload shape.
/// The tables are plain data so they can be unit-tested away from any fetch.
const LIST_ALIASES: &[&str] = &["questions", "lessons", "plan", "sections"];
const PROMPT_ALIASES: &[&str] = &["prompt", "text", "question"];
const OPTION_LIST_ALIASES: &[&str] = &["choices", "answers", "options"];
const OPTION_VALUE_ALIASES: &[&str] = &["value", "id", "key"];
const OPTION_LABEL_ALIASES: &[&str] = &["label", "text", "option"];
const SKILL_ALIASES: &[&str] = &["skill", "focus", "category"];
const DIFFICULTY_ALIASES: &[&str] = &["difficulty", "level"];
const SEQUENCE_ALIASES: &[&str] = &["question_number", "questionNumber", "number"];
const ID_ALIASES: &[&str] = &["id", "question_id", "questionId"];

const LESSON_ID_ALIASES: &[&str] = &["id", "lesson_id", "lessonId"];
const TITLE_ALIASES: &[&str] = &["title", "name", "lesson"];
const STATUS_ALIASES: &[&str] = &["status", "state"];
const NEXT_ACTION_ALIASES: &[&str] = &["next_action", "nextAction", "action"];

const SCORE_ALIASES: &[&str] = &["score", "average_score", "averageScore"];
const TOTAL_ALIASES: &[&str] = &["total_questions", "totalQuestions", "total"];
const CORRECT_ALIASES: &[&str] = &["correct_count", "correctCount", "correct"];
const FEEDBACK_ALIASES: &[&str] = &["feedback", "summary"];
const RESULT_LIST_ALIASES: &[&str] = &["results", "questionResults", "details"];
const USER_ANSWER_ALIASES: &[&str] = &["user_answer", "userAnswer", "answer"];
const CORRECT_ANSWER_ALIASES: &[&str] = &["correct_answer", "correctAnswer"];
const IS_CORRECT_ALIASES: &[&str] = &["is_correct", "isCorrect", "correct"];
const RECOMMENDATION_LIST_ALIASES: &[&str] = &["recommendations", "suggestions"];
const RECOMMENDATION_TEXT_ALIASES: &[&str] = &["text", "message", "tip"];

const HISTORY_LIST_ALIASES: &[&str] = &["recent_history", "recentHistory", "history"];
const DATE_ALIASES: &[&str] = &["date", "submitted_at", "submittedAt"];

pub const SESSION_ID_ALIASES: &[&str] = &["session_id", "sessionId", "id"];

/// First present, non-null value among `aliases` on an object payload.
pub fn first<'a>(payload: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let map = payload.as_object()?;
    aliases
        .iter()
        .find_map(|alias| map.get(*alias).filter(|v| !v.is_null()))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Alias lookup producing a string; numbers are stringified.
pub fn first_string(payload: &Value, aliases: &[&str]) -> Option<String> {
    first(payload, aliases).and_then(scalar_string)
}

/// Alias lookup producing a number; numeric strings are accepted.
pub fn first_number(payload: &Value, aliases: &[&str]) -> Option<f64> {
    match first(payload, aliases)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Reduce an arbitrary payload to its list of records.
///
/// Ordered attempts, first match wins: null → empty; already a list → as-is;
/// a list-valued field among the known wrapper aliases → that list; otherwise
/// the object's own values with primitives discarded, in original key order.
pub fn records(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            for alias in LIST_ALIASES {
                if let Some(Value::Array(items)) = map.get(*alias) {
                    return items.clone();
                }
            }
            debug!("payload has no list field, falling back to record-valued members");
            map.values().filter(|v| v.is_object()).cloned().collect()
        }
        _ => Vec::new(),
    }
}

/// Derive a question id: server sequence number, then explicit id, then a
/// positional fallback. Uniqueness of the fallback against real ids rests on
/// the `q-` prefix only; it is not structurally enforced.
fn question_id(record: &Value, index: usize) -> String {
    if let Some(seq) = first(record, SEQUENCE_ALIASES) {
        let number = match seq {
            Value::Number(n) => n.as_i64().map(|n| n.to_string()),
            Value::String(s) => s.trim().parse::<i64>().ok().map(|n| n.to_string()),
            _ => None,
        };
        if let Some(number) = number {
            return format!("question-{number}");
        }
    }
    if let Some(id) = first_string(record, ID_ALIASES) {
        return id;
    }
    format!("q-{index}")
}

fn choices(record: &Value) -> Vec<Choice> {
    let Some(Value::Array(raw)) = first(record, OPTION_LIST_ALIASES) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|entry| match entry {
            Value::String(_) | Value::Number(_) => {
                let text = scalar_string(entry)?;
                Some(Choice {
                    label: text.clone(),
                    value: text,
                })
            }
            Value::Object(_) => {
                let value = first_string(entry, OPTION_VALUE_ALIASES);
                let label = first_string(entry, OPTION_LABEL_ALIASES);
                match (label, value) {
                    (Some(label), Some(value)) => Some(Choice { label, value }),
                    (Some(label), None) => Some(Choice {
                        value: label.clone(),
                        label,
                    }),
                    (None, Some(value)) => Some(Choice {
                        label: value.clone(),
                        value,
                    }),
                    (None, None) => None,
                }
            }
            _ => None,
        })
        .collect()
}

/// Canonicalize a question payload of any supported shape.
///
/// `default_skill` fills in when a record names no skill of its own, usually
/// the session's focus area.
pub fn normalize_questions(payload: &Value, default_skill: &str) -> Vec<Question> {
    records(payload)
        .iter()
        .enumerate()
        .map(|(index, record)| Question {
            id: question_id(record, index),
            prompt: first_string(record, PROMPT_ALIASES).unwrap_or_default(),
            skill: first_string(record, SKILL_ALIASES)
                .unwrap_or_else(|| default_skill.to_string()),
            difficulty: first_string(record, DIFFICULTY_ALIASES),
            options: choices(record),
        })
        .collect()
}

/// Canonicalize a lesson-plan payload of any supported shape.
pub fn normalize_lessons(payload: &Value) -> Vec<LessonItem> {
    records(payload)
        .iter()
        .enumerate()
        .map(|(index, record)| LessonItem {
            id: first_string(record, LESSON_ID_ALIASES).unwrap_or_else(|| format!("lesson-{index}")),
            title: first_string(record, TITLE_ALIASES).unwrap_or_default(),
            skill: first_string(record, SKILL_ALIASES).unwrap_or_default(),
            status: LessonStatus::parse(
                &first_string(record, STATUS_ALIASES).unwrap_or_default(),
            ),
            next_action: first_string(record, NEXT_ACTION_ALIASES),
        })
        .collect()
}

fn recommendations(payload: &Value) -> Vec<Recommendation> {
    let Some(Value::Array(raw)) = first(payload, RECOMMENDATION_LIST_ALIASES) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(Recommendation {
                skill: None,
                text: s.clone(),
            }),
            Value::Object(_) => Some(Recommendation {
                skill: first_string(entry, SKILL_ALIASES),
                text: first_string(entry, RECOMMENDATION_TEXT_ALIASES).unwrap_or_default(),
            }),
            _ => None,
        })
        .collect()
}

fn question_results(payload: &Value) -> Vec<QuestionResult> {
    let Some(Value::Array(raw)) = first(payload, RESULT_LIST_ALIASES) else {
        return Vec::new();
    };
    raw.iter()
        .filter(|entry| entry.is_object())
        .map(|entry| QuestionResult {
            question_number: first_number(entry, SEQUENCE_ALIASES).map(|n| n as u64),
            user_answer: first_string(entry, USER_ANSWER_ALIASES).unwrap_or_default(),
            correct_answer: first_string(entry, CORRECT_ANSWER_ALIASES).unwrap_or_default(),
            is_correct: first(entry, IS_CORRECT_ALIASES)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
        .collect()
}

/// Canonicalize a submit response.
pub fn normalize_submission(payload: &Value) -> SubmissionResult {
    SubmissionResult {
        score: first_number(payload, SCORE_ALIASES).unwrap_or(0.0),
        total_questions: first_number(payload, TOTAL_ALIASES).unwrap_or(0.0) as usize,
        correct_count: first_number(payload, CORRECT_ALIASES).map(|n| n as u64),
        feedback: first_string(payload, FEEDBACK_ALIASES),
        recommendations: recommendations(payload),
        results: question_results(payload),
    }
}

/// Canonicalize the dashboard summary's recent-history list.
pub fn normalize_history(payload: &Value) -> Vec<HistoryItem> {
    let Some(Value::Array(raw)) = first(payload, HISTORY_LIST_ALIASES) else {
        return Vec::new();
    };
    raw.iter()
        .filter(|entry| entry.is_object())
        .map(|entry| HistoryItem {
            session_id: first_string(entry, SESSION_ID_ALIASES).unwrap_or_default(),
            date: first_string(entry, DATE_ALIASES).unwrap_or_default(),
            level: first_string(entry, &["level"]).unwrap_or_default(),
            score: first_number(entry, &["score"]).unwrap_or(0.0),
        })
        .collect()
}
