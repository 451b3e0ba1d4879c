use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::Money;

/// Immutable ledger row. Every wallet balance change writes exactly one.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gst_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub net_amount: Option<Money>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    AddMoney,
    QuizParticipation,
    ReferralBonus,
    AdminReferralBonus,
    StreakReward,
    Refund,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl Transaction {
    pub fn success(user_id: &str, kind: TransactionKind, amount: Money, description: &str) -> Self {
        Transaction {
            transaction_id: Self::generate_id(),
            user_id: user_id.to_string(),
            kind,
            status: TransactionStatus::Success,
            amount,
            gst_amount: None,
            net_amount: None,
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }

    /// "QV" followed by ten uppercase hex characters.
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("QV{}", hex[..10].to_uppercase())
    }
}
