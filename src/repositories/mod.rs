pub mod memory;
pub mod question_repository;
pub mod quiz_repository;
pub mod quiz_result_repository;
pub mod referral_settings_repository;
pub mod streak_repository;
pub mod transaction_repository;
pub mod user_repository;

use std::sync::Arc;

pub use question_repository::{MongoQuestionRepository, QuestionRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use quiz_result_repository::{MongoQuizResultRepository, QuizResultRepository};
pub use referral_settings_repository::{
    MongoReferralSettingsRepository, ReferralSettingsRepository,
};
pub use streak_repository::{
    MongoStreakRepository, MongoStreakRewardRepository, StreakRepository, StreakRewardRepository,
};
pub use transaction_repository::{MongoTransactionRepository, TransactionRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

use crate::{db::Database, errors::AppResult};

/// One handle per collection, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn QuizResultRepository>,
    pub streaks: Arc<dyn StreakRepository>,
    pub streak_rewards: Arc<dyn StreakRewardRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub referral_settings: Arc<dyn ReferralSettingsRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(MongoUserRepository::new(db)),
            quizzes: Arc::new(MongoQuizRepository::new(db)),
            questions: Arc::new(MongoQuestionRepository::new(db)),
            results: Arc::new(MongoQuizResultRepository::new(db)),
            streaks: Arc::new(MongoStreakRepository::new(db)),
            streak_rewards: Arc::new(MongoStreakRewardRepository::new(db)),
            transactions: Arc::new(MongoTransactionRepository::new(db)),
            referral_settings: Arc::new(MongoReferralSettingsRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::InMemoryUserRepository::new()),
            quizzes: Arc::new(memory::InMemoryQuizRepository::new()),
            questions: Arc::new(memory::InMemoryQuestionRepository::new()),
            results: Arc::new(memory::InMemoryQuizResultRepository::new()),
            streaks: Arc::new(memory::InMemoryStreakRepository::new()),
            streak_rewards: Arc::new(memory::InMemoryStreakRewardRepository::new()),
            transactions: Arc::new(memory::InMemoryTransactionRepository::new()),
            referral_settings: Arc::new(memory::InMemoryReferralSettingsRepository::new()),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users.ensure_indexes().await?;
        self.quizzes.ensure_indexes().await?;
        self.questions.ensure_indexes().await?;
        self.results.ensure_indexes().await?;
        self.streaks.ensure_indexes().await?;
        self.streak_rewards.ensure_indexes().await?;
        self.transactions.ensure_indexes().await?;
        Ok(())
    }
}
