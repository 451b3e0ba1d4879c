use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{IndexOptions, UpdateOptions},
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::{QuizStreak, StreakReward},
};

#[async_trait]
pub trait StreakRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> AppResult<Option<QuizStreak>>;
    /// Fails with `AlreadyExists` when the user already has a record.
    async fn insert(&self, streak: QuizStreak) -> AppResult<QuizStreak>;
    /// Stores `streak` only if the stored record still carries
    /// `expected_version`. Returns whether the swap happened.
    async fn replace_versioned(&self, streak: &QuizStreak, expected_version: i64) -> AppResult<bool>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

#[async_trait]
pub trait StreakRewardRepository: Send + Sync {
    async fn find_by_day(&self, streak_day: u32) -> AppResult<Option<StreakReward>>;
    async fn find_all(&self) -> AppResult<Vec<StreakReward>>;
    async fn upsert(&self, reward: StreakReward) -> AppResult<StreakReward>;
    /// Returns whether a reward was configured for the day.
    async fn delete(&self, streak_day: u32) -> AppResult<bool>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoStreakRepository {
    collection: Collection<QuizStreak>,
}

impl MongoStreakRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quiz_streaks");
        Self { collection }
    }
}

#[async_trait]
impl StreakRepository for MongoStreakRepository {
    async fn find_by_user(&self, user_id: &str) -> AppResult<Option<QuizStreak>> {
        let streak = self.collection.find_one(doc! { "user_id": user_id }).await?;
        Ok(streak)
    }

    async fn insert(&self, streak: QuizStreak) -> AppResult<QuizStreak> {
        match self.collection.insert_one(&streak).await {
            Ok(_) => Ok(streak),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Streak for user '{}' already exists",
                streak.user_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_versioned(&self, streak: &QuizStreak, expected_version: i64) -> AppResult<bool> {
        let result = self
            .collection
            .replace_one(
                doc! { "user_id": &streak.user_id, "version": expected_version },
                streak,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_index).await?;
        log::info!("Created indexes for quiz_streaks collection");
        Ok(())
    }
}

pub struct MongoStreakRewardRepository {
    collection: Collection<StreakReward>,
}

impl MongoStreakRewardRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("streak_rewards");
        Self { collection }
    }
}

#[async_trait]
impl StreakRewardRepository for MongoStreakRewardRepository {
    async fn find_by_day(&self, streak_day: u32) -> AppResult<Option<StreakReward>> {
        let reward = self
            .collection
            .find_one(doc! { "streak_day": streak_day })
            .await?;
        Ok(reward)
    }

    async fn find_all(&self) -> AppResult<Vec<StreakReward>> {
        let rewards = self
            .collection
            .find(doc! {})
            .sort(doc! { "streak_day": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(rewards)
    }

    async fn upsert(&self, reward: StreakReward) -> AppResult<StreakReward> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.collection
            .update_one(
                doc! { "streak_day": reward.streak_day },
                doc! { "$set": { "reward_amount": reward.reward_amount.minor() } },
            )
            .with_options(options)
            .await?;
        Ok(reward)
    }

    async fn delete(&self, streak_day: u32) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "streak_day": streak_day })
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let day_index = IndexModel::builder()
            .keys(doc! { "streak_day": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("streak_day_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(day_index).await?;
        Ok(())
    }
}
