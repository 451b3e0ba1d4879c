//! In-memory repositories for tests and local runs without MongoDB.
//!
//! Each conditional write holds the write lock for the whole
//! check-and-modify, matching the atomicity of the MongoDB updates.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        Money, Question, Quiz, QuizResult, QuizStreak, ReferralEarning, ReferralSettings,
        StreakReward, Transaction, User,
    },
    repositories::{
        QuestionRepository, QuizRepository, QuizResultRepository, ReferralSettingsRepository,
        StreakRepository, StreakRewardRepository, TransactionRepository, UserRepository,
    },
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.mobile == user.mobile) {
            return Err(AppError::AlreadyExists(format!(
                "User with mobile '{}' already exists",
                user.mobile
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn debit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) if user.wallet >= amount => {
                user.wallet = user.wallet - amount;
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn credit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.wallet = user.wallet + amount;
            user.clone()
        }))
    }

    async fn mark_joined_quiz(&self, id: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) if !user.has_joined_quiz => {
                user.has_joined_quiz = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_referral_bonus(&self, id: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) if !user.referral_bonus_given => {
                user.referral_bonus_given = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_referral_earning(&self, id: &str, earning: ReferralEarning) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))?;
        user.referral_earnings.push(earning);
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) || quizzes.values().any(|q| q.title == quiz.title) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                quiz.title
            )));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.get(id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.values().find(|q| q.title == title).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<_> = quizzes.values().cloned().collect();
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
        Ok(items)
    }

    async fn add_entry(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        match quizzes.get_mut(quiz_id) {
            Some(quiz) if !quiz.has_entry(user_id) => {
                quiz.entries.push(user_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_end_time(&self, quiz_id: &str, end_time: &str) -> AppResult<()> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes.get_mut(quiz_id).ok_or_else(|| {
            AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id))
        })?;
        quiz.end_time = Some(end_time.to_string());
        Ok(())
    }

    async fn update_details(&self, quiz: &Quiz) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes
            .values()
            .any(|q| q.id != quiz.id && q.title == quiz.title)
        {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                quiz.title
            )));
        }
        match quizzes.get_mut(&quiz.id) {
            Some(stored) => {
                let entries = std::mem::take(&mut stored.entries);
                *stored = Quiz {
                    entries,
                    modified_at: Some(chrono::Utc::now()),
                    ..quiz.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_if_unjoined(&self, quiz_id: &str) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        match quizzes.get(quiz_id) {
            Some(quiz) if quiz.entries.is_empty() => {
                quizzes.remove(quiz_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: Arc<RwLock<Vec<Question>>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        let mut questions = self.questions.write().await;
        if questions
            .iter()
            .any(|q| q.quiz_id == question.quiz_id && q.text == question.text)
        {
            return Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            ));
        }
        questions.push(question.clone());
        Ok(question)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        let questions = self.questions.read().await;
        Ok(questions.iter().find(|q| q.id == id).cloned())
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        let questions = self.questions.read().await;
        let mut items: Vec<_> = questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        items.sort_by_key(|q| q.order);
        Ok(items)
    }

    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let questions = self.questions.read().await;
        Ok(questions.iter().filter(|q| q.quiz_id == quiz_id).count() as u64)
    }

    async fn exists_with_text(&self, quiz_id: &str, text: &str) -> AppResult<bool> {
        let questions = self.questions.read().await;
        Ok(questions
            .iter()
            .any(|q| q.quiz_id == quiz_id && q.text == text))
    }

    async fn update(&self, question: &Question) -> AppResult<bool> {
        let mut questions = self.questions.write().await;
        if questions.iter().any(|q| {
            q.id != question.id && q.quiz_id == question.quiz_id && q.text == question.text
        }) {
            return Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            ));
        }
        match questions.iter_mut().find(|q| q.id == question.id) {
            Some(stored) => {
                stored.text = question.text.clone();
                stored.options = question.options.clone();
                stored.correct_option_index = question.correct_option_index;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut questions = self.questions.write().await;
        let before = questions.len();
        questions.retain(|q| q.id != id);
        Ok(questions.len() < before)
    }

    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let mut questions = self.questions.write().await;
        let before = questions.len();
        questions.retain(|q| q.quiz_id != quiz_id);
        Ok((before - questions.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizResultRepository {
    results: Arc<RwLock<Vec<QuizResult>>>,
}

impl InMemoryQuizResultRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryQuizResultRepository {
    async fn create(&self, result: QuizResult) -> AppResult<QuizResult> {
        let mut results = self.results.write().await;
        if let Some(key) = &result.submission_key {
            if results.iter().any(|r| r.submission_key.as_ref() == Some(key)) {
                return Err(AppError::AlreadyExists(format!(
                    "Result for quiz '{}' already submitted",
                    result.quiz_id
                )));
            }
        }
        results.push(result.clone());
        Ok(result)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizResult>> {
        let results = self.results.read().await;
        Ok(results.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<QuizResult>> {
        let results = self.results.read().await;
        let mut items: Vec<_> = results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStreakRepository {
    streaks: Arc<RwLock<HashMap<String, QuizStreak>>>,
}

impl InMemoryStreakRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreakRepository for InMemoryStreakRepository {
    async fn find_by_user(&self, user_id: &str) -> AppResult<Option<QuizStreak>> {
        let streaks = self.streaks.read().await;
        Ok(streaks.get(user_id).cloned())
    }

    async fn insert(&self, streak: QuizStreak) -> AppResult<QuizStreak> {
        let mut streaks = self.streaks.write().await;
        if streaks.contains_key(&streak.user_id) {
            return Err(AppError::AlreadyExists(format!(
                "Streak for user '{}' already exists",
                streak.user_id
            )));
        }
        streaks.insert(streak.user_id.clone(), streak.clone());
        Ok(streak)
    }

    async fn replace_versioned(&self, streak: &QuizStreak, expected_version: i64) -> AppResult<bool> {
        let mut streaks = self.streaks.write().await;
        match streaks.get_mut(&streak.user_id) {
            Some(stored) if stored.version == expected_version => {
                *stored = streak.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStreakRewardRepository {
    rewards: Arc<RwLock<HashMap<u32, StreakReward>>>,
}

impl InMemoryStreakRewardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreakRewardRepository for InMemoryStreakRewardRepository {
    async fn find_by_day(&self, streak_day: u32) -> AppResult<Option<StreakReward>> {
        let rewards = self.rewards.read().await;
        Ok(rewards.get(&streak_day).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<StreakReward>> {
        let rewards = self.rewards.read().await;
        let mut items: Vec<_> = rewards.values().cloned().collect();
        items.sort_by_key(|r| r.streak_day);
        Ok(items)
    }

    async fn upsert(&self, reward: StreakReward) -> AppResult<StreakReward> {
        let mut rewards = self.rewards.write().await;
        rewards.insert(reward.streak_day, reward.clone());
        Ok(reward)
    }

    async fn delete(&self, streak_day: u32) -> AppResult<bool> {
        let mut rewards = self.rewards.write().await;
        Ok(rewards.remove(&streak_day).is_some())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, transaction: Transaction) -> AppResult<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions
            .iter()
            .any(|t| t.transaction_id == transaction.transaction_id)
        {
            return Err(AppError::AlreadyExists(format!(
                "Transaction '{}' already exists",
                transaction.transaction_id
            )));
        }
        transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        // newest first; insertion order breaks timestamp ties
        Ok(transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReferralSettingsRepository {
    settings: Arc<RwLock<Option<ReferralSettings>>>,
}

impl InMemoryReferralSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralSettingsRepository for InMemoryReferralSettingsRepository {
    async fn get(&self) -> AppResult<Option<ReferralSettings>> {
        let settings = self.settings.read().await;
        Ok(settings.clone())
    }

    async fn save(&self, settings: ReferralSettings) -> AppResult<ReferralSettings> {
        let mut stored = self.settings.write().await;
        *stored = Some(settings.clone());
        Ok(settings)
    }
}
