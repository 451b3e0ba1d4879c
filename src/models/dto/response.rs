use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::{
    models::domain::{
        Money, PrizeTier, Quiz, QuizResult, QuizStreak, QuizType, ReferralSettings, StreakReward,
        StreakRewardEntry, Transaction, TransactionKind, TransactionStatus,
    },
    services::{
        join_service::{Delivery, JoinResult},
        quiz_classifier::{Page, PagedClassification},
        wallet_service::LedgerEntry,
    },
};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrizeTierDto {
    pub start_rank: u32,
    pub end_rank: u32,
    pub prize: String,
}

impl From<PrizeTier> for PrizeTierDto {
    fn from(tier: PrizeTier) -> Self {
        PrizeTierDto {
            start_rank: tier.start_rank,
            end_rank: tier.end_rank,
            prize: tier.prize.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizDto {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quiz_type: QuizType,
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub joining_amount: String,
    pub prize_tiers: Vec<PrizeTierDto>,
    pub participants: usize,
}

impl From<Quiz> for QuizDto {
    fn from(quiz: Quiz) -> Self {
        QuizDto {
            participants: quiz.entries.len(),
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            quiz_type: quiz.quiz_type,
            date: quiz.date,
            start_time: quiz.start_time,
            end_time: quiz.end_time,
            joining_amount: quiz.joining_amount.to_string(),
            prize_tiers: quiz.prize_tiers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizPageDto {
    pub items: Vec<QuizDto>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl From<Page<Quiz>> for QuizPageDto {
    fn from(page: Page<Quiz>) -> Self {
        QuizPageDto {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizBucketsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming: Option<QuizPageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<QuizPageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<QuizPageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<QuizPageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_quiz: Option<QuizPageDto>,
}

impl From<PagedClassification> for QuizBucketsResponse {
    fn from(paged: PagedClassification) -> Self {
        QuizBucketsResponse {
            upcoming: paged.upcoming.map(Into::into),
            live: paged.live.map(Into::into),
            completed: paged.completed.map(Into::into),
            expired: paged.expired.map(Into::into),
            today_quiz: paged.today_quiz.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakRewardEntryDto {
    pub streak_day: u32,
    pub reward_amount: String,
    pub awarded_at: NaiveDateTime,
}

impl From<StreakRewardEntry> for StreakRewardEntryDto {
    fn from(entry: StreakRewardEntry) -> Self {
        StreakRewardEntryDto {
            streak_day: entry.streak_day,
            reward_amount: entry.reward_amount.to_string(),
            awarded_at: entry.awarded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakDto {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_played_date: NaiveDate,
    pub lives: u32,
    pub countdown_end_time: Option<NaiveDateTime>,
    pub rewards_history: Vec<StreakRewardEntryDto>,
}

impl From<QuizStreak> for StreakDto {
    fn from(streak: QuizStreak) -> Self {
        StreakDto {
            current_streak: streak.current_streak,
            best_streak: streak.best_streak,
            last_played_date: streak.last_played_date,
            lives: streak.lives,
            countdown_end_time: streak.countdown_end_time,
            rewards_history: streak.rewards_history.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub quiz_id: String,
    pub already_joined: bool,
    pub charged: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<String>,
    pub streak: StreakDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    pub delivery: Delivery,
}

impl From<JoinResult> for JoinResponse {
    fn from(result: JoinResult) -> Self {
        JoinResponse {
            quiz_id: result.quiz_id,
            already_joined: result.already_joined,
            charged: result.charged.to_string(),
            new_balance: result.new_balance.map(|b| b.to_string()),
            streak: result.streak.into(),
            reward: result.reward.map(|r| r.to_string()),
            delivery: result.delivery,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDto {
    pub transaction_id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        TransactionDto {
            transaction_id: tx.transaction_id,
            kind: tx.kind,
            status: tx.status,
            amount: tx.amount.to_string(),
            gst_amount: tx.gst_amount.map(|a| a.to_string()),
            net_amount: tx.net_amount.map(|a| a.to_string()),
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryDto {
    pub new_balance: String,
    pub transaction: TransactionDto,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(entry: LedgerEntry) -> Self {
        LedgerEntryDto {
            new_balance: entry.new_balance.to_string(),
            transaction: entry.transaction.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResultDto {
    pub id: String,
    pub quiz_id: String,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub not_attempted_count: u32,
    pub points: f64,
    pub bonus_points: f64,
    pub streak_bonus: f64,
    pub completion_percentage: f64,
    pub submitted_at: DateTime<Utc>,
}

impl From<QuizResult> for QuizResultDto {
    fn from(result: QuizResult) -> Self {
        QuizResultDto {
            id: result.id,
            quiz_id: result.quiz_id,
            correct_count: result.correct_count,
            incorrect_count: result.incorrect_count,
            not_attempted_count: result.not_attempted_count,
            points: result.points,
            bonus_points: result.bonus_points,
            streak_bonus: result.streak_bonus,
            completion_percentage: result.completion_percentage,
            submitted_at: result.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakRewardDto {
    pub streak_day: u32,
    pub reward_amount: String,
}

impl From<StreakReward> for StreakRewardDto {
    fn from(reward: StreakReward) -> Self {
        StreakRewardDto {
            streak_day: reward.streak_day,
            reward_amount: reward.reward_amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralSettingsDto {
    pub referral_bonus: String,
}

impl From<ReferralSettings> for ReferralSettingsDto {
    fn from(settings: ReferralSettings) -> Self {
        ReferralSettingsDto {
            referral_bonus: settings.referral_bonus.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletDto {
    pub balance: String,
}

impl From<Money> for WalletDto {
    fn from(balance: Money) -> Self {
        WalletDto {
            balance: balance.to_string(),
        }
    }
}
