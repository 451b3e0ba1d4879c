#[cfg(test)]
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::models::domain::{Money, Question, Quiz, QuizType, User};

    /// A user holding `balance` whole units in their wallet.
    pub fn funded_user(mobile: &str, balance: i64) -> User {
        User::test_user(mobile, Money::from_major(balance))
    }

    /// A Mega quiz on 2024-06-01 starting at `start`, with `fee` whole units
    /// as its joining amount.
    pub fn mega_quiz(title: &str, start: &str, fee: i64) -> Quiz {
        Quiz::new(
            title,
            QuizType::Mega,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            Some(start.to_string()),
            Money::from_major(fee),
        )
    }

    /// `count` two-option questions whose correct answer is option 1.
    pub fn questions_for(quiz_id: &str, count: u32) -> Vec<Question> {
        (0..count)
            .map(|i| {
                Question::new(
                    quiz_id,
                    &format!("Question {}", i + 1),
                    vec!["wrong".to_string(), "right".to_string()],
                    1,
                    i,
                )
            })
            .collect()
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
pub mod doubles {
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::{
        errors::{AppError, AppResult},
        models::domain::Quiz,
        repositories::{memory::InMemoryQuizRepository, QuizRepository},
    };

    pub enum RosterFault {
        /// `add_entry` fails without touching the roster.
        Fail,
        /// `add_entry` succeeds after sleeping.
        Delay(Duration),
    }

    /// In-memory quiz store whose roster writes misbehave.
    pub struct FaultyRoster {
        inner: InMemoryQuizRepository,
        fault: RosterFault,
    }

    impl FaultyRoster {
        pub fn new(fault: RosterFault) -> Self {
            Self {
                inner: InMemoryQuizRepository::new(),
                fault,
            }
        }
    }

    #[async_trait]
    impl QuizRepository for FaultyRoster {
        async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
            self.inner.create(quiz).await
        }
        async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>> {
            self.inner.find_by_title(title).await
        }
        async fn find_all(&self) -> AppResult<Vec<Quiz>> {
            self.inner.find_all().await
        }
        async fn add_entry(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
            match self.fault {
                RosterFault::Fail => {
                    Err(AppError::DatabaseError("primary stepped down".to_string()))
                }
                RosterFault::Delay(pause) => {
                    tokio::time::sleep(pause).await;
                    self.inner.add_entry(quiz_id, user_id).await
                }
            }
        }
        async fn set_end_time(&self, quiz_id: &str, end_time: &str) -> AppResult<()> {
            self.inner.set_end_time(quiz_id, end_time).await
        }
        async fn update_details(&self, quiz: &Quiz) -> AppResult<bool> {
            self.inner.update_details(quiz).await
        }
        async fn delete_if_unjoined(&self, quiz_id: &str) -> AppResult<bool> {
            self.inner.delete_if_unjoined(quiz_id).await
        }
        async fn ensure_indexes(&self) -> AppResult<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::test_helpers::*;
    use actix_web::http::StatusCode;

    #[test]
    fn mega_quiz_charges_its_fee() {
        let quiz = mega_quiz("Fixture", "10:00:00 AM", 20);
        assert_eq!(quiz.entry_fee().to_string(), "20.00");
        assert!(quiz.entries.is_empty());
    }

    #[test]
    fn questions_are_ordered_from_zero() {
        let questions = questions_for("quiz-1", 3);
        let orders: Vec<u32> = questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(questions.iter().all(|q| q.is_correct(1)));
    }

    #[test]
    fn funded_user_has_balance() {
        assert_eq!(funded_user("9000000001", 100).wallet.to_string(), "100.00");
    }

    #[test]
    fn status_helpers() {
        assert_error_status(StatusCode::PAYMENT_REQUIRED);
        assert_success_status(StatusCode::CREATED);
    }
}
