use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::domain::{AnswerSnapshot, QuizType};

static MONEY_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^\d+(\.\d{1,2})?$").expect("MONEY_REGEX is a valid regex pattern")
});

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PrizeTierRequest {
    #[validate(range(min = 1))]
    pub start_rank: u32,
    #[validate(range(min = 1))]
    pub end_rank: u32,
    #[validate(regex(path = *MONEY_REGEX, message = "Prize must be an amount like 100 or 99.50"))]
    pub prize: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub quiz_type: QuizType,

    pub date: NaiveDate,

    /// "hh:mm:ss AM/PM"
    pub start_time: Option<String>,
    pub end_time: Option<String>,

    #[validate(regex(path = *MONEY_REGEX, message = "Joining amount must be an amount like 20 or 19.50"))]
    pub joining_amount: String,

    #[validate(nested)]
    #[serde(default)]
    pub prize_tiers: Vec<PrizeTierRequest>,
}

/// Partial quiz edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub quiz_type: Option<QuizType>,

    pub date: Option<NaiveDate>,

    pub start_time: Option<String>,

    #[validate(regex(path = *MONEY_REGEX, message = "Joining amount must be an amount like 20 or 19.50"))]
    pub joining_amount: Option<String>,

    pub prize_tiers: Option<Vec<PrizeTierRequest>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    #[validate(length(min = 2, message = "A question needs at least two options"))]
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    pub correct_option_index: u32,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(ValidationError::new("blank_option"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[serde(default)]
    pub answers: Vec<AnswerSnapshot>,
}

/// Optional caller-supplied clock, "DD/MM/YYYY, hh:mm:ss AM/PM".
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct JoinRequest {
    #[validate(length(min = 1, max = 40))]
    pub now: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BucketQuery {
    pub bucket: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    pub now: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertStreakRewardRequest {
    #[validate(range(min = 1))]
    pub streak_day: u32,
    #[validate(regex(path = *MONEY_REGEX, message = "Reward must be an amount like 5 or 2.50"))]
    pub reward_amount: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReferralSettingsRequest {
    #[validate(regex(path = *MONEY_REGEX, message = "Referral bonus must be an amount like 10 or 7.50"))]
    pub referral_bonus: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreditKind {
    AddMoney,
    AdminReferralBonus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WalletCreditRequest {
    #[validate(regex(path = *MONEY_REGEX, message = "Amount must be like 100 or 99.50"))]
    pub amount: String,
    pub kind: CreditKind,
    #[validate(length(max = 200))]
    pub description: Option<String>,
}
