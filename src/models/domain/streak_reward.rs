use serde::{Deserialize, Serialize};

use crate::models::domain::Money;

/// Wallet reward paid the first time a user's streak reaches `streak_day`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreakReward {
    pub streak_day: u32,
    pub reward_amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferralSettings {
    pub referral_bonus: Money,
}
