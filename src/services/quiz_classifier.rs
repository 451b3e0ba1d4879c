use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::domain::Quiz,
    services::time_parser::{start_of_day, QuizWindow},
};

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizBucket {
    Upcoming,
    Live,
    Completed,
    Expired,
    Today,
}

impl std::str::FromStr for QuizBucket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(QuizBucket::Upcoming),
            "live" => Ok(QuizBucket::Live),
            "completed" => Ok(QuizBucket::Completed),
            "expired" => Ok(QuizBucket::Expired),
            "today" => Ok(QuizBucket::Today),
            other => Err(AppError::ValidationError(format!(
                "Unknown quiz bucket '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub upcoming: Vec<Quiz>,
    pub live: Vec<Quiz>,
    pub completed: Vec<Quiz>,
    pub expired: Vec<Quiz>,
    pub today_quiz: Vec<Quiz>,
}

impl Classification {
    pub fn bucket(&self, bucket: QuizBucket) -> &[Quiz] {
        match bucket {
            QuizBucket::Upcoming => &self.upcoming,
            QuizBucket::Live => &self.live,
            QuizBucket::Completed => &self.completed,
            QuizBucket::Expired => &self.expired,
            QuizBucket::Today => &self.today_quiz,
        }
    }
}

/// Places a scheduled quiz in exactly one lifecycle bucket. `None` for
/// quizzes without a parseable window.
pub fn lifecycle_bucket(quiz: &Quiz, now: NaiveDateTime) -> Option<QuizBucket> {
    let window = QuizWindow::for_quiz(quiz)?;
    let bucket = if window.start > now {
        QuizBucket::Upcoming
    } else if window.contains(now) {
        QuizBucket::Live
    } else if !quiz.entries.is_empty() {
        QuizBucket::Completed
    } else {
        QuizBucket::Expired
    };
    Some(bucket)
}

pub fn classify(quizzes: &[Quiz], now: NaiveDateTime) -> Classification {
    let today = start_of_day(now);
    let tomorrow = today + Duration::days(1);
    let mut classification = Classification::default();

    for quiz in quizzes {
        let Some(bucket) = lifecycle_bucket(quiz, now) else {
            log::debug!("Skipping quiz {} without a schedule", quiz.id);
            continue;
        };

        let target = match bucket {
            QuizBucket::Upcoming => &mut classification.upcoming,
            QuizBucket::Live => &mut classification.live,
            QuizBucket::Completed => &mut classification.completed,
            QuizBucket::Expired | QuizBucket::Today => &mut classification.expired,
        };
        target.push(quiz.clone());

        let quiz_day = quiz.date.and_time(NaiveTime::default());
        if quiz_day >= today && quiz_day < tomorrow {
            classification.today_quiz.push(quiz.clone());
        }
    }

    classification
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Out-of-range values are clamped rather than rejected.
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T: Clone> Page<T> {
    pub fn slice(items: &[T], request: PageRequest) -> Self {
        let total = items.len();
        let start = request.offset().min(total);
        let end = start.saturating_add(request.limit).min(total);
        Page {
            items: items[start..end].to_vec(),
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PagedClassification {
    pub upcoming: Option<Page<Quiz>>,
    pub live: Option<Page<Quiz>>,
    pub completed: Option<Page<Quiz>>,
    pub expired: Option<Page<Quiz>>,
    pub today_quiz: Option<Page<Quiz>>,
}

/// Classifies and paginates each bucket independently. With `only`, the
/// other buckets are left empty.
pub fn classify_paged(
    quizzes: &[Quiz],
    now: NaiveDateTime,
    only: Option<QuizBucket>,
    request: PageRequest,
) -> PagedClassification {
    let classification = classify(quizzes, now);
    let page_of = |bucket: QuizBucket| match only {
        Some(wanted) if wanted != bucket => None,
        _ => Some(Page::slice(classification.bucket(bucket), request)),
    };

    PagedClassification {
        upcoming: page_of(QuizBucket::Upcoming),
        live: page_of(QuizBucket::Live),
        completed: page_of(QuizBucket::Completed),
        expired: page_of(QuizBucket::Expired),
        today_quiz: page_of(QuizBucket::Today),
    }
}
