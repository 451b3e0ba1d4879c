use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Money, Question, Quiz, QuizStreak, TransactionKind, User},
    repositories::{QuestionRepository, QuizRepository, UserRepository},
    services::{
        referral_service::ReferralService,
        streak_service::StreakService,
        time_parser::QuizWindow,
        wallet_service::WalletService,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveredQuestion {
    pub question_id: String,
    pub text: String,
    pub options: Vec<String>,
    /// Seconds left to answer this question.
    pub remaining_time: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Waiting {
        starts_at: NaiveDateTime,
    },
    Questions {
        total_questions: usize,
        skipped_questions: usize,
        questions: Vec<DeliveredQuestion>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub quiz_id: String,
    pub user_id: String,
    pub already_joined: bool,
    pub charged: Money,
    pub new_balance: Option<Money>,
    pub streak: QuizStreak,
    pub reward: Option<Money>,
    pub delivery: Delivery,
}

pub struct JoinService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    users: Arc<dyn UserRepository>,
    wallet: Arc<WalletService>,
    streaks: Arc<StreakService>,
    referrals: Arc<ReferralService>,
    seconds_per_question: u32,
}

struct Registration {
    newly_joined: bool,
    charged: Money,
    new_balance: Option<Money>,
}

impl JoinService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        users: Arc<dyn UserRepository>,
        wallet: Arc<WalletService>,
        streaks: Arc<StreakService>,
        referrals: Arc<ReferralService>,
        seconds_per_question: u32,
    ) -> Self {
        Self {
            quizzes,
            questions,
            users,
            wallet,
            streaks,
            referrals,
            seconds_per_question: seconds_per_question.max(1),
        }
    }

    pub async fn join(&self, user_id: &str, quiz_id: &str, now: NaiveDateTime) -> AppResult<JoinResult> {
        require_uuid(quiz_id, "quiz")?;
        require_uuid(user_id, "user")?;

        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))?;

        if user.is_blocked {
            return Err(AppError::Unauthorized("User account is blocked".to_string()));
        }

        let window = self.joinable_window(&quiz, now)?;

        let registration = if quiz.has_entry(user_id) {
            Registration {
                newly_joined: false,
                charged: Money::ZERO,
                new_balance: None,
            }
        } else {
            self.register(&quiz, &user).await?
        };

        let streak = self.streaks.record_play(user_id, now).await?;
        self.referrals.unlock_on_first_join(&user).await?;

        let delivery = self.deliver(&quiz, window, now).await?;

        log::info!(
            "User {} joined quiz {} (new: {}, charged: {})",
            user_id,
            quiz_id,
            registration.newly_joined,
            registration.charged
        );

        Ok(JoinResult {
            quiz_id: quiz.id,
            user_id: user.id,
            already_joined: !registration.newly_joined,
            charged: registration.charged,
            new_balance: registration.new_balance,
            streak: streak.streak,
            reward: streak.reward,
            delivery,
        })
    }

    // Practice quizzes have no schedule to respect.
    fn joinable_window(&self, quiz: &Quiz, now: NaiveDateTime) -> AppResult<Option<QuizWindow>> {
        if quiz.quiz_type.is_practice() {
            return Ok(None);
        }

        let window = QuizWindow::for_quiz(quiz).ok_or_else(|| {
            AppError::Conflict(format!("Quiz '{}' is not scheduled yet", quiz.title))
        })?;
        if now > window.end {
            return Err(AppError::Conflict(format!(
                "Quiz '{}' has already ended",
                quiz.title
            )));
        }
        Ok(Some(window))
    }

    /// Charges the entry fee and appends the user to the roster as one unit.
    /// If the roster write fails or loses a race, the fee is refunded.
    async fn register(&self, quiz: &Quiz, user: &User) -> AppResult<Registration> {
        let fee = quiz.entry_fee();
        if fee.is_zero() {
            let newly_joined = self.quizzes.add_entry(&quiz.id, &user.id).await?;
            return Ok(Registration {
                newly_joined,
                charged: Money::ZERO,
                new_balance: None,
            });
        }

        let entry = self
            .wallet
            .debit(
                &user.id,
                fee,
                TransactionKind::QuizParticipation,
                &format!("Joined {}", quiz.title),
            )
            .await?;

        match self.quizzes.add_entry(&quiz.id, &user.id).await {
            Ok(true) => Ok(Registration {
                newly_joined: true,
                charged: fee,
                new_balance: Some(entry.new_balance),
            }),
            Ok(false) => {
                log::info!(
                    "User {} already on roster of {}, refunding duplicate charge",
                    user.id,
                    quiz.id
                );
                let refund = self.refund(quiz, user, fee).await?;
                Ok(Registration {
                    newly_joined: false,
                    charged: Money::ZERO,
                    new_balance: Some(refund),
                })
            }
            Err(e) => {
                log::warn!(
                    "Roster update for quiz {} failed after charging {}: {}",
                    quiz.id,
                    user.id,
                    e
                );
                self.refund(quiz, user, fee).await?;
                Err(e)
            }
        }
    }

    async fn refund(&self, quiz: &Quiz, user: &User, fee: Money) -> AppResult<Money> {
        match self
            .wallet
            .credit(
                &user.id,
                fee,
                TransactionKind::Refund,
                &format!("Refund for {}", quiz.title),
            )
            .await
        {
            Ok(entry) => Ok(entry.new_balance),
            Err(e) => {
                log::error!(
                    "RECONCILE: user {} charged {} for quiz {} without a roster entry: {}",
                    user.id,
                    fee,
                    quiz.id,
                    e
                );
                Err(AppError::InternalError(
                    "Join could not be completed and requires reconciliation".to_string(),
                ))
            }
        }
    }

    async fn deliver(
        &self,
        quiz: &Quiz,
        window: Option<QuizWindow>,
        now: NaiveDateTime,
    ) -> AppResult<Delivery> {
        if let Some(window) = window {
            if now < window.start {
                return Ok(Delivery::Waiting {
                    starts_at: window.start,
                });
            }
        }

        let questions = self.questions.find_by_quiz(&quiz.id).await?;
        let elapsed = window.map_or(0, |w| w.elapsed_seconds(now).max(0));
        Ok(pace_questions(&questions, elapsed, self.seconds_per_question))
    }
}

/// Drops the questions a late joiner has already missed and times the one
/// in progress.
pub fn pace_questions(questions: &[Question], elapsed_seconds: i64, seconds_per_question: u32) -> Delivery {
    let per_question = i64::from(seconds_per_question.max(1));
    let total = questions.len();
    let skipped = usize::try_from(elapsed_seconds / per_question)
        .unwrap_or(usize::MAX)
        .min(total);
    let first_remaining = (per_question - elapsed_seconds % per_question) as u32;

    let delivered = questions
        .iter()
        .skip(skipped)
        .enumerate()
        .map(|(i, q)| DeliveredQuestion {
            question_id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            remaining_time: if i == 0 {
                first_remaining
            } else {
                seconds_per_question
            },
        })
        .collect();

    Delivery::Questions {
        total_questions: total,
        skipped_questions: skipped,
        questions: delivered,
    }
}

fn require_uuid(id: &str, what: &str) -> AppResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| AppError::ValidationError(format!("Invalid {} id format", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app_state::AppState,
        config::Config,
        models::domain::QuizType,
        repositories::Repositories,
        services::notification_service::LogNotifier,
        test_utils::doubles::{FaultyRoster, RosterFault},
    };
    use chrono::NaiveDate;

    fn question(quiz_id: &str, order: u32) -> Question {
        Question::new(
            quiz_id,
            &format!("Question {}", order),
            vec!["A".to_string(), "B".to_string()],
            0,
            order,
        )
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    struct Fixture {
        state: AppState,
        repos: Repositories,
        user: User,
        quiz: Quiz,
    }

    async fn fixture(wallet: Money, fee: Money, questions: u32) -> Fixture {
        let repos = Repositories::in_memory();
        let state = AppState::from_repositories(Config::test_config(), repos.clone(), Arc::new(LogNotifier));

        let user = User::test_user("9000000030", wallet);
        repos.users.create(user.clone()).await.unwrap();

        let mut quiz = Quiz::new(
            "Morning Mega",
            QuizType::Mega,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            Some("10:00:00 AM".to_string()),
            fee,
        );
        quiz.end_time = Some("10:05:00 AM".to_string());
        repos.quizzes.create(quiz.clone()).await.unwrap();
        for order in 0..questions {
            repos.questions.create(question(&quiz.id, order)).await.unwrap();
        }

        Fixture {
            state,
            repos,
            user,
            quiz,
        }
    }

    #[tokio::test]
    async fn join_before_start_charges_and_waits() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 5).await;

        let result = f
            .state
            .join_service
            .join(&f.user.id, &f.quiz.id, at(9, 55, 0))
            .await
            .unwrap();

        assert!(!result.already_joined);
        assert_eq!(result.charged, Money::from_major(20));
        assert_eq!(result.new_balance.map(|b| b.to_string()), Some("80.00".to_string()));
        assert!(matches!(result.delivery, Delivery::Waiting { starts_at } if starts_at == at(10, 0, 0)));
        assert_eq!(result.streak.current_streak, 1);

        let quiz = f.repos.quizzes.find_by_id(&f.quiz.id).await.unwrap().unwrap();
        assert_eq!(quiz.entries, vec![f.user.id.clone()]);
    }

    #[tokio::test]
    async fn late_joiner_skips_elapsed_questions() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 5).await;

        let result = f
            .state
            .join_service
            .join(&f.user.id, &f.quiz.id, at(10, 0, 23))
            .await
            .unwrap();

        match result.delivery {
            Delivery::Questions {
                total_questions,
                skipped_questions,
                questions,
            } => {
                assert_eq!(total_questions, 5);
                assert_eq!(skipped_questions, 2);
                assert_eq!(questions.len(), 3);
                assert_eq!(questions[0].remaining_time, 7);
                assert_eq!(questions[1].remaining_time, 10);
            }
            other => panic!("expected questions, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejoin_is_not_charged_twice() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 3).await;
        let service = &f.state.join_service;

        service.join(&f.user.id, &f.quiz.id, at(9, 59, 0)).await.unwrap();
        let second = service.join(&f.user.id, &f.quiz.id, at(10, 0, 5)).await.unwrap();

        assert!(second.already_joined);
        assert_eq!(second.charged, Money::ZERO);
        assert_eq!(
            f.state.wallet_service.balance(&f.user.id).await.unwrap(),
            Money::from_major(80)
        );
        let rows = f.state.wallet_service.transactions_for_user(&f.user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_roster_untouched() {
        let f = fixture(Money::from_major(10), Money::from_major(20), 3).await;

        let result = f.state.join_service.join(&f.user.id, &f.quiz.id, at(9, 59, 0)).await;

        assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
        let quiz = f.repos.quizzes.find_by_id(&f.quiz.id).await.unwrap().unwrap();
        assert!(quiz.entries.is_empty());
        assert!(f.repos.transactions.find_by_user(&f.user.id).await.unwrap().is_empty());
        assert!(f.repos.streaks.find_by_user(&f.user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn joining_after_end_is_a_conflict_and_free() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 3).await;

        let result = f.state.join_service.join(&f.user.id, &f.quiz.id, at(10, 5, 1)).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(
            f.state.wallet_service.balance(&f.user.id).await.unwrap(),
            Money::from_major(100)
        );
    }

    #[tokio::test]
    async fn malformed_and_unknown_ids_are_rejected() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 3).await;
        let service = &f.state.join_service;

        assert!(matches!(
            service.join(&f.user.id, "not-a-uuid", at(9, 0, 0)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.join(&f.user.id, &Uuid::new_v4().to_string(), at(9, 0, 0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.join(&Uuid::new_v4().to_string(), &f.quiz.id, at(9, 0, 0)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn practice_quiz_is_free_and_delivers_everything() {
        let f = fixture(Money::ZERO, Money::from_major(20), 0).await;
        let mut practice = Quiz::new(
            "Practice Round",
            QuizType::Practice,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            None,
            Money::from_major(50),
        );
        practice.end_time = None;
        f.repos.quizzes.create(practice.clone()).await.unwrap();
        for order in 0..4 {
            f.repos.questions.create(question(&practice.id, order)).await.unwrap();
        }

        let result = f
            .state
            .join_service
            .join(&f.user.id, &practice.id, at(23, 0, 0))
            .await
            .unwrap();

        assert_eq!(result.charged, Money::ZERO);
        assert!(f.repos.transactions.find_by_user(&f.user.id).await.unwrap().is_empty());
        match result.delivery {
            Delivery::Questions { questions, skipped_questions, .. } => {
                assert_eq!(skipped_questions, 0);
                assert_eq!(questions.len(), 4);
                assert!(questions.iter().all(|q| q.remaining_time == 10));
            }
            other => panic!("expected questions, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blocked_user_cannot_join() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 1).await;
        let mut blocked = User::test_user("9000000031", Money::from_major(100));
        blocked.is_blocked = true;
        f.repos.users.create(blocked.clone()).await.unwrap();

        let result = f.state.join_service.join(&blocked.id, &f.quiz.id, at(9, 0, 0)).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_charge_once() {
        let f = fixture(Money::from_major(100), Money::from_major(20), 2).await;

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let join_service = f.state.join_service.clone();
                let (user_id, quiz_id) = (f.user.id.clone(), f.quiz.id.clone());
                tokio::spawn(async move { join_service.join(&user_id, &quiz_id, at(9, 0, 0)).await })
            })
            .collect();

        let mut newly_joined = 0;
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            if !result.already_joined {
                newly_joined += 1;
            }
        }
        assert_eq!(newly_joined, 1);

        assert_eq!(
            f.state.wallet_service.balance(&f.user.id).await.unwrap(),
            Money::from_major(80)
        );
        let quiz = f.repos.quizzes.find_by_id(&f.quiz.id).await.unwrap().unwrap();
        assert_eq!(quiz.entries, vec![f.user.id.clone()]);

        let rows = f.repos.transactions.find_by_user(&f.user.id).await.unwrap();
        let charges = rows
            .iter()
            .filter(|t| t.kind == TransactionKind::QuizParticipation)
            .count();
        let refunds = rows.iter().filter(|t| t.kind == TransactionKind::Refund).count();
        assert_eq!(charges - refunds, 1);
    }

    #[tokio::test]
    async fn roster_failure_refunds_the_fee() {
        let mut repos = Repositories::in_memory();
        repos.quizzes = Arc::new(FaultyRoster::new(RosterFault::Fail));
        let state = AppState::from_repositories(Config::test_config(), repos.clone(), Arc::new(LogNotifier));

        let user = User::test_user("9000000032", Money::from_major(100));
        repos.users.create(user.clone()).await.unwrap();
        let mut quiz = Quiz::new(
            "Fragile",
            QuizType::Lite,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            Some("10:00:00 AM".to_string()),
            Money::from_major(20),
        );
        quiz.end_time = Some("10:05:00 AM".to_string());
        repos.quizzes.create(quiz.clone()).await.unwrap();

        let result = state.join_service.join(&user.id, &quiz.id, at(9, 0, 0)).await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(
            state.wallet_service.balance(&user.id).await.unwrap(),
            Money::from_major(100)
        );
        let kinds: Vec<_> = repos
            .transactions
            .find_by_user(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert!(kinds.contains(&TransactionKind::QuizParticipation));
        assert!(kinds.contains(&TransactionKind::Refund));
    }

    #[test]
    fn pacing_clamps_to_total() {
        let questions: Vec<_> = (0..3).map(|i| question("q", i)).collect();

        match pace_questions(&questions, 95, 10) {
            Delivery::Questions {
                skipped_questions,
                questions,
                ..
            } => {
                assert_eq!(skipped_questions, 3);
                assert!(questions.is_empty());
            }
            other => panic!("expected questions, got {:?}", other),
        }
    }
}
