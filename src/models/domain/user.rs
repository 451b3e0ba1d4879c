use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::Money;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    pub wallet: Money,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Id of the user whose referral code was used at sign-up.
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub referral_bonus_given: bool,
    #[serde(default)]
    pub has_joined_quiz: bool,
    #[serde(default)]
    pub referral_earnings: Vec<ReferralEarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferralEarning {
    pub referred_user_id: String,
    pub amount: Money,
    pub earned_at: DateTime<Utc>,
}

impl User {
    pub fn new(first_name: &str, last_name: &str, mobile: &str) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            mobile: mobile.to_string(),
            email: None,
            role: UserRole::User,
            wallet: Money::ZERO,
            is_blocked: false,
            referral_code: None,
            referred_by: None,
            referral_bonus_given: false,
            has_joined_quiz: false,
            referral_earnings: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
impl User {
    pub fn test_user(mobile: &str, wallet: Money) -> Self {
        let mut user = User::new("Test", "User", mobile);
        user.wallet = wallet;
        user
    }
}
