use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::Money;

/// Per-user daily play streak. Writes go through a compare-and-swap on
/// `version`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizStreak {
    pub id: String,
    pub user_id: String,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_played_date: NaiveDate,
    pub lives: u32,
    pub life_last_given: NaiveDateTime,
    #[serde(default)]
    pub countdown_end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub rewards_history: Vec<StreakRewardEntry>,
    #[serde(default)]
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreakRewardEntry {
    pub streak_day: u32,
    pub reward_amount: Money,
    pub awarded_at: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    Started,
    SameDay,
    Consecutive,
    Forgiven,
    Reset,
}

impl QuizStreak {
    pub fn start(user_id: &str, now: NaiveDateTime) -> Self {
        let today = now.date();
        QuizStreak {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            current_streak: 1,
            best_streak: 1,
            last_played_date: today,
            lives: 1,
            life_last_given: now,
            countdown_end_time: Some(grace_deadline(today)),
            rewards_history: Vec::new(),
            version: 0,
            created_at: Some(Utc::now()),
        }
    }

    /// Applies one play at `now`. A second play on the same calendar day
    /// (or a clock that went backwards) leaves the record untouched.
    pub fn advance(&mut self, now: NaiveDateTime) -> StreakTransition {
        let today = now.date();
        let days_since = (today - self.last_played_date).num_days();
        if days_since <= 0 {
            return StreakTransition::SameDay;
        }

        self.replenish_lives(now);

        let transition = if days_since == 1 {
            self.current_streak += 1;
            StreakTransition::Consecutive
        } else if self.lives > 0 && self.countdown_end_time.map_or(true, |end| end >= now) {
            self.lives -= 1;
            StreakTransition::Forgiven
        } else {
            self.current_streak = 1;
            StreakTransition::Reset
        };

        self.best_streak = self.best_streak.max(self.current_streak);
        self.last_played_date = today;
        self.countdown_end_time = Some(grace_deadline(today));
        transition
    }

    /// Grants one life when `now` is at least one calendar month past the
    /// last grant.
    pub fn replenish_lives(&mut self, now: NaiveDateTime) -> bool {
        let months = (now.year() - self.life_last_given.year()) * 12
            + (now.month() as i32 - self.life_last_given.month() as i32);
        if months >= 1 {
            self.lives += 1;
            self.life_last_given = now;
            true
        } else {
            false
        }
    }

    pub fn has_reward_for(&self, streak_day: u32) -> bool {
        self.rewards_history
            .iter()
            .any(|entry| entry.streak_day == streak_day)
    }

    /// Appends a reward unless that streak day was ever rewarded before.
    pub fn record_reward(&mut self, streak_day: u32, amount: Money, now: NaiveDateTime) -> bool {
        if self.has_reward_for(streak_day) {
            return false;
        }
        self.rewards_history.push(StreakRewardEntry {
            streak_day,
            reward_amount: amount,
            awarded_at: now,
        });
        true
    }
}

// Midnight three days after the played day: a life covers one missed day.
fn grace_deadline(played: NaiveDate) -> NaiveDateTime {
    (played + Duration::days(3)).and_time(NaiveTime::default())
}
