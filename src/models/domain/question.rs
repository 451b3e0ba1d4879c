use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: u32,
    // position within the quiz, assigned on insert
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn new(
        quiz_id: &str,
        text: &str,
        options: Vec<String>,
        correct_option_index: u32,
        order: u32,
    ) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            text: text.to_string(),
            options,
            correct_option_index,
            order,
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_correct(&self, selected_option_index: u32) -> bool {
        selected_option_index == self.correct_option_index
    }
}
