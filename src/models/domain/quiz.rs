use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::Money;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quiz_type: QuizType,
    pub date: NaiveDate,
    // "hh:mm:ss AM/PM" on `date`
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub joining_amount: Money,
    #[serde(default)]
    pub prize_tiers: Vec<PrizeTier>,
    /// User ids in join order; a user appears at most once.
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
pub enum QuizType {
    #[serde(rename = "Mega Quiz")]
    Mega,
    #[serde(rename = "Special Quiz")]
    Special,
    #[serde(rename = "Lite Quiz")]
    Lite,
    #[serde(rename = "Practice Quiz")]
    Practice,
}

impl QuizType {
    pub fn is_practice(self) -> bool {
        matches!(self, QuizType::Practice)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrizeTier {
    pub start_rank: u32,
    pub end_rank: u32,
    pub prize: Money,
}

impl Quiz {
    pub fn new(
        title: &str,
        quiz_type: QuizType,
        date: NaiveDate,
        start_time: Option<String>,
        joining_amount: Money,
    ) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: None,
            quiz_type,
            date,
            start_time,
            end_time: None,
            joining_amount,
            prize_tiers: Vec::new(),
            entries: Vec::new(),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn has_entry(&self, user_id: &str) -> bool {
        self.entries.iter().any(|id| id == user_id)
    }

    /// Fee charged on join. Practice quizzes are always free.
    pub fn entry_fee(&self) -> Money {
        if self.quiz_type.is_practice() {
            Money::ZERO
        } else {
            self.joining_amount
        }
    }

    pub fn prize_for_rank(&self, rank: u32) -> Option<Money> {
        self.prize_tiers
            .iter()
            .find(|tier| tier.start_rank <= rank && rank <= tier.end_rank)
            .map(|tier| tier.prize)
    }
}
