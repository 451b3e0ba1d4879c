use std::sync::Arc;

use chrono::NaiveDateTime;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Money, PrizeTier, Quiz},
        dto::request::{CreateQuizRequest, PrizeTierRequest, UpdateQuizRequest},
    },
    repositories::{QuestionRepository, QuizRepository},
    services::{
        question_service::paced_end_time,
        quiz_classifier::{classify_paged, PageRequest, PagedClassification, QuizBucket},
        time_parser::{format_clock, parse_clock_time},
    },
};

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    seconds_per_question: u32,
}

impl QuizService {
    pub fn new(
        repository: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        seconds_per_question: u32,
    ) -> Self {
        Self {
            repository,
            questions,
            seconds_per_question,
        }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))
    }

    pub async fn create_quiz(&self, request: CreateQuizRequest) -> AppResult<Quiz> {
        request.validate()?;

        let title = request.title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationError("Title cannot be blank".to_string()));
        }

        let practice = request.quiz_type.is_practice();
        let start_time = match request.start_time.as_deref() {
            Some(raw) => Some(normalize_clock(raw, "start_time")?),
            None if practice => None,
            None => {
                return Err(AppError::ValidationError(
                    "start_time is required for scored quizzes".to_string(),
                ))
            }
        };
        let end_time = request
            .end_time
            .as_deref()
            .map(|raw| normalize_clock(raw, "end_time"))
            .transpose()?;

        if let (Some(start), Some(end)) = (start_time.as_deref(), end_time.as_deref()) {
            if parse_clock_time(start) >= parse_clock_time(end) {
                return Err(AppError::ValidationError(
                    "end_time must be later than start_time".to_string(),
                ));
            }
        }

        let joining_amount = if practice {
            Money::ZERO
        } else {
            request.joining_amount.parse::<Money>()?
        };
        let prize_tiers = build_prize_tiers(&request.prize_tiers)?;

        if self.repository.find_by_title(title).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                title
            )));
        }

        let mut quiz = Quiz::new(title, request.quiz_type, request.date, start_time, joining_amount);
        quiz.description = request.description;
        quiz.end_time = end_time;
        quiz.prize_tiers = prize_tiers;

        let created = self.repository.create(quiz).await?;
        log::info!("Created quiz '{}' ({})", created.title, created.id);
        Ok(created)
    }

    /// Applies a partial edit. A quiz with questions gets its end time
    /// re-paced from the new start.
    pub async fn update_quiz(&self, id: &str, request: UpdateQuizRequest) -> AppResult<Quiz> {
        request.validate()?;
        let mut quiz = self.get_quiz(id).await?;

        if let Some(title) = request.title.as_deref() {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::ValidationError("Title cannot be blank".to_string()));
            }
            if title != quiz.title {
                if self.repository.find_by_title(title).await?.is_some() {
                    return Err(AppError::AlreadyExists(format!(
                        "Quiz with title '{}' already exists",
                        title
                    )));
                }
                quiz.title = title.to_string();
            }
        }
        if let Some(description) = request.description {
            quiz.description = Some(description);
        }
        if let Some(quiz_type) = request.quiz_type {
            quiz.quiz_type = quiz_type;
        }
        if let Some(date) = request.date {
            quiz.date = date;
        }
        if let Some(raw) = request.start_time.as_deref() {
            quiz.start_time = Some(normalize_clock(raw, "start_time")?);
        }
        if let Some(raw) = request.joining_amount.as_deref() {
            quiz.joining_amount = raw.parse()?;
        }
        if let Some(tiers) = request.prize_tiers.as_deref() {
            quiz.prize_tiers = build_prize_tiers(tiers)?;
        }

        if quiz.quiz_type.is_practice() {
            quiz.joining_amount = Money::ZERO;
        } else if quiz.start_time.is_none() {
            return Err(AppError::ValidationError(
                "start_time is required for scored quizzes".to_string(),
            ));
        }

        let count = self.questions.count_by_quiz(id).await?;
        if count > 0 {
            if let Some(end_time) = paced_end_time(&quiz, count, self.seconds_per_question)? {
                quiz.end_time = Some(end_time);
            }
        } else if let (Some(start), Some(end)) = (quiz.start_time.as_deref(), quiz.end_time.as_deref()) {
            if parse_clock_time(start) >= parse_clock_time(end) {
                return Err(AppError::ValidationError(
                    "end_time must be later than start_time".to_string(),
                ));
            }
        }

        if !self.repository.update_details(&quiz).await? {
            return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
        }
        log::info!("Updated quiz '{}' ({})", quiz.title, quiz.id);
        Ok(quiz)
    }

    /// Deletes a quiz nobody has joined, together with its questions.
    pub async fn delete_quiz(&self, id: &str) -> AppResult<()> {
        let quiz = self.get_quiz(id).await?;

        if !self.repository.delete_if_unjoined(id).await? {
            return match self.repository.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict(format!(
                    "Quiz '{}' already has participants",
                    quiz.title
                ))),
                None => Err(AppError::NotFound(format!("Quiz with id '{}' not found", id))),
            };
        }

        let removed = self.questions.delete_by_quiz(id).await?;
        log::info!("Deleted quiz '{}' ({}) with {} questions", quiz.title, id, removed);
        Ok(())
    }

    pub async fn list_buckets(
        &self,
        now: NaiveDateTime,
        only: Option<QuizBucket>,
        page: PageRequest,
    ) -> AppResult<PagedClassification> {
        let quizzes = self.repository.find_all().await?;
        Ok(classify_paged(&quizzes, now, only, page))
    }
}

// Accepts "h:mm AM" style input and stores the canonical "hh:mm:ss AM".
fn normalize_clock(raw: &str, field: &str) -> AppResult<String> {
    parse_clock_time(raw)
        .map(format_clock)
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} must look like 'hh:mm:ss AM/PM', got '{}'",
                field, raw
            ))
        })
}

fn build_prize_tiers(requests: &[PrizeTierRequest]) -> AppResult<Vec<PrizeTier>> {
    let mut tiers = Vec::with_capacity(requests.len());
    let mut previous_end = 0;

    for tier in requests {
        if tier.start_rank > tier.end_rank {
            return Err(AppError::ValidationError(format!(
                "Prize tier {}-{} has start rank after end rank",
                tier.start_rank, tier.end_rank
            )));
        }
        if tier.start_rank <= previous_end {
            return Err(AppError::ValidationError(format!(
                "Prize tier {}-{} overlaps or is out of order",
                tier.start_rank, tier.end_rank
            )));
        }
        previous_end = tier.end_rank;

        tiers.push(PrizeTier {
            start_rank: tier.start_rank,
            end_rank: tier.end_rank,
            prize: tier.prize.parse()?,
        });
    }

    Ok(tiers)
}
