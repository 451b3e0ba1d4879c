use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizResult {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub answers: Vec<AnswerSnapshot>,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub not_attempted_count: u32,
    pub base_points: f64,
    pub streak_bonus: f64,
    pub bonus_points: f64,
    /// base + streak bonus + bonus points
    pub points: f64,
    pub completion_percentage: f64,
    /// `"{user_id}:{quiz_id}"` for scored quizzes, absent for practice. A
    /// unique sparse index on it allows one scored result per user and quiz.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub submission_key: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerSnapshot {
    pub question_id: String,
    /// `None` means not attempted.
    pub selected_option_index: Option<u32>,
}

impl QuizResult {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn submission_key_for(user_id: &str, quiz_id: &str) -> String {
        format!("{}:{}", user_id, quiz_id)
    }

    pub fn attempted_count(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }
}
