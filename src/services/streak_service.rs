use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Money, QuizStreak, StreakReward, StreakTransition, TransactionKind},
    repositories::{StreakRepository, StreakRewardRepository},
    services::wallet_service::WalletService,
};

const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct StreakOutcome {
    pub streak: QuizStreak,
    pub reward: Option<Money>,
    pub transition: StreakTransition,
}

pub struct StreakService {
    streaks: Arc<dyn StreakRepository>,
    rewards: Arc<dyn StreakRewardRepository>,
    wallet: Arc<WalletService>,
}

impl StreakService {
    pub fn new(
        streaks: Arc<dyn StreakRepository>,
        rewards: Arc<dyn StreakRewardRepository>,
        wallet: Arc<WalletService>,
    ) -> Self {
        Self {
            streaks,
            rewards,
            wallet,
        }
    }

    /// Advances the user's streak for a play at `now`.
    ///
    /// The record is read, transitioned in memory and written back only if
    /// its version is unchanged, so two concurrent joins can never both
    /// spend a life or both claim a milestone. The milestone is recorded in
    /// the same write; the wallet is credited only once that write lands.
    pub async fn record_play(&self, user_id: &str, now: NaiveDateTime) -> AppResult<StreakOutcome> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            match self.streaks.find_by_user(user_id).await? {
                None => {
                    let mut streak = QuizStreak::start(user_id, now);
                    let reward = self.claim_milestone(&mut streak, now).await?;

                    match self.streaks.insert(streak).await {
                        Ok(streak) => {
                            log::info!("Started streak for user {}", user_id);
                            return self.settle(streak, reward, StreakTransition::Started).await;
                        }
                        Err(AppError::AlreadyExists(_)) => {
                            log::debug!(
                                "Streak for {} created concurrently, retrying (attempt {})",
                                user_id,
                                attempt
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some(existing) => {
                    let mut streak = existing.clone();
                    let transition = streak.advance(now);
                    if transition == StreakTransition::SameDay {
                        return Ok(StreakOutcome {
                            streak: existing,
                            reward: None,
                            transition,
                        });
                    }

                    let reward = self.claim_milestone(&mut streak, now).await?;
                    streak.version = existing.version + 1;

                    if self.streaks.replace_versioned(&streak, existing.version).await? {
                        log::info!(
                            "Streak for user {} moved to {} ({:?})",
                            user_id,
                            streak.current_streak,
                            transition
                        );
                        return self.settle(streak, reward, transition).await;
                    }
                    log::debug!(
                        "Streak for {} changed underneath us, retrying (attempt {})",
                        user_id,
                        attempt
                    );
                }
            }
        }

        log::warn!("Gave up updating streak for {} after contention", user_id);
        Err(AppError::Conflict(format!(
            "Streak for user '{}' is being updated concurrently",
            user_id
        )))
    }

    pub async fn get_streak(&self, user_id: &str) -> AppResult<QuizStreak> {
        self.streaks
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No streak recorded for user '{}'", user_id)))
    }

    pub async fn upsert_reward(&self, streak_day: u32, reward_amount: Money) -> AppResult<StreakReward> {
        if streak_day == 0 {
            return Err(AppError::ValidationError(
                "Streak day must be at least 1".to_string(),
            ));
        }
        if !reward_amount.is_positive() {
            return Err(AppError::ValidationError(
                "Reward amount must be greater than zero".to_string(),
            ));
        }

        let reward = self
            .rewards
            .upsert(StreakReward {
                streak_day,
                reward_amount,
            })
            .await?;
        log::info!("Streak reward for day {} set to {}", streak_day, reward_amount);
        Ok(reward)
    }

    pub async fn list_rewards(&self) -> AppResult<Vec<StreakReward>> {
        self.rewards.find_all().await
    }

    pub async fn delete_reward(&self, streak_day: u32) -> AppResult<()> {
        if !self.rewards.delete(streak_day).await? {
            return Err(AppError::NotFound(format!(
                "No streak reward configured for day {}",
                streak_day
            )));
        }
        log::info!("Streak reward for day {} removed", streak_day);
        Ok(())
    }

    async fn claim_milestone(&self, streak: &mut QuizStreak, now: NaiveDateTime) -> AppResult<Option<Money>> {
        let day = streak.current_streak;
        let configured = match self.rewards.find_by_day(day).await? {
            Some(reward) if reward.reward_amount.is_positive() => reward,
            _ => return Ok(None),
        };

        if streak.record_reward(day, configured.reward_amount, now) {
            Ok(Some(configured.reward_amount))
        } else {
            Ok(None)
        }
    }

    async fn settle(
        &self,
        streak: QuizStreak,
        reward: Option<Money>,
        transition: StreakTransition,
    ) -> AppResult<StreakOutcome> {
        if let Some(amount) = reward {
            let description = format!("Streak reward for day {}", streak.current_streak);
            if let Err(e) = self
                .wallet
                .credit(&streak.user_id, amount, TransactionKind::StreakReward, &description)
                .await
            {
                log::error!(
                    "RECONCILE: streak reward {} for user {} day {} recorded but not paid: {}",
                    amount,
                    streak.user_id,
                    streak.current_streak,
                    e
                );
                return Err(e);
            }
        }

        Ok(StreakOutcome {
            streak,
            reward,
            transition,
        })
    }
}
