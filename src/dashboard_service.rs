use serde_json::Value;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::ClientError;
use crate::models::{DashboardStats, Identity, LessonItem};
use crate::normalize;

const SCORE_ALIASES: &[&str] = &["average_score", "averageScore", "current_score", "score"];
const TARGET_ALIASES: &[&str] = &["target_score", "targetScore"];
const WORDS_ALIASES: &[&str] = &["words_mastered", "wordsMastered", "total_words"];
const STREAK_ALIASES: &[&str] = &["streak_days", "streakDays", "streak"];
const LEVEL_ALIASES: &[&str] = &["current_level", "currentLevel", "level"];
const QUIZ_COUNT_ALIASES: &[&str] = &["total_quizzes", "totalQuizzes"];

const PLACEHOLDER: &str = "--";

/// Merges the dashboard summary and the lesson plan into one view.
///
/// The two fetches are joined: the view updates only when both succeed, and
/// any failure keeps the last good data on screen. Which half failed is a
/// logging detail, not part of the surfaced error.
#[derive(Debug)]
pub struct DashboardService {
    client: ApiClient,
    user_id: String,
    summary: Option<Value>,
    lesson_plan: Vec<LessonItem>,
}

impl DashboardService {
    pub fn new(client: ApiClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            summary: None,
            lesson_plan: Vec::new(),
        }
    }

    pub fn lesson_plan(&self) -> &[LessonItem] {
        &self.lesson_plan
    }

    pub fn summary(&self) -> Option<&Value> {
        self.summary.as_ref()
    }

    /// Refresh both halves of the dashboard. All-or-nothing: on any failure
    /// the stored summary and lesson plan are left exactly as they were.
    pub async fn refresh(&mut self, token: Option<&str>) -> Result<(), ClientError> {
        let summary_path = format!("/api/dashboard/{}", self.user_id);
        let summary_fut = self.client.get(&summary_path, None);
        let plan_fut = self.client.get("/api/lesson-plan", token);

        match tokio::try_join!(summary_fut, plan_fut) {
            Ok((summary, plan)) => {
                self.lesson_plan = normalize::normalize_lessons(&plan);
                self.summary = Some(summary);
                info!(
                    user_id = %self.user_id,
                    lessons = self.lesson_plan.len(),
                    "dashboard refreshed"
                );
                Ok(())
            }
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "dashboard refresh failed, keeping last good data");
                Err(ClientError::PartialFetch)
            }
        }
    }

    /// Derive the display stats, defaulting every field so the view renders
    /// from any summary shape — including none at all.
    pub fn stats(&self, identity: &Identity) -> DashboardStats {
        let summary = self.summary.clone().unwrap_or(Value::Null);

        let current_score = normalize::first_number(&summary, SCORE_ALIASES)
            .map(format_score)
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let target_score = normalize::first_number(&summary, TARGET_ALIASES)
            .map(format_score)
            .or_else(|| {
                identity
                    .user
                    .as_ref()
                    .and_then(|u| u.target_score)
                    .map(|t| t.to_string())
            })
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let words_mastered = normalize::first_number(&summary, WORDS_ALIASES).unwrap_or(0.0) as u64;
        let streak_days = normalize::first_number(&summary, STREAK_ALIASES).unwrap_or(0.0) as u64;

        DashboardStats {
            current_score,
            target_score,
            words_mastered,
            streak: format!("{streak_days} days"),
            current_level: normalize::first_string(&summary, LEVEL_ALIASES),
            total_quizzes: normalize::first_number(&summary, QUIZ_COUNT_ALIASES).unwrap_or(0.0)
                as u64,
            recent_history: normalize::normalize_history(&summary),
        }
    }
}

fn format_score(score: f64) -> String {
    if (score - score.round()).abs() < f64::EPSILON {
        format!("{}", score.round() as i64)
    } else {
        format!("{score:.1}")
    }
}
