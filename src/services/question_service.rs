use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Question, Quiz},
        dto::request::CreateQuestionRequest,
    },
    repositories::{QuestionRepository, QuizRepository},
    services::time_parser::{end_time_for, parse_clock_time},
};

pub struct QuestionService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    seconds_per_question: u32,
}

impl QuestionService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        seconds_per_question: u32,
    ) -> Self {
        Self {
            quizzes,
            questions,
            seconds_per_question,
        }
    }

    /// Adds a question and stretches the quiz's end time so every question
    /// gets its full slot. A question that would push the end past midnight
    /// is rejected.
    pub async fn add_question(&self, quiz_id: &str, request: CreateQuestionRequest) -> AppResult<Question> {
        validate_question(&request)?;

        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;

        if self.questions.exists_with_text(quiz_id, &request.text).await? {
            return Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            ));
        }

        let existing = self.questions.find_by_quiz(quiz_id).await?;
        paced_end_time(&quiz, existing.len() as u64 + 1, self.seconds_per_question)?;

        let order = existing.iter().map(|q| q.order + 1).max().unwrap_or(0);
        let question = Question::new(
            quiz_id,
            &request.text,
            request.options,
            request.correct_option_index,
            order,
        );
        let question = self.questions.create(question).await?;

        // Recount so concurrent inserts are paced too.
        let count = self.questions.count_by_quiz(quiz_id).await?;
        match paced_end_time(&quiz, count, self.seconds_per_question) {
            Ok(Some(end_time)) => {
                self.quizzes.set_end_time(quiz_id, &end_time).await?;
                log::debug!("Quiz {} now has {} questions, ends at {}", quiz_id, count, end_time);
            }
            Ok(None) => {}
            Err(e) => {
                self.questions.delete(&question.id).await?;
                return Err(e);
            }
        }

        Ok(question)
    }

    pub async fn questions_for_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        self.questions.find_by_quiz(quiz_id).await
    }

    pub async fn update_question(&self, id: &str, request: CreateQuestionRequest) -> AppResult<Question> {
        validate_question(&request)?;

        let mut question = self.find_question(id).await?;
        if question.text != request.text
            && self.questions.exists_with_text(&question.quiz_id, &request.text).await?
        {
            return Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            ));
        }

        question.text = request.text;
        question.options = request.options;
        question.correct_option_index = request.correct_option_index;

        if !self.questions.update(&question).await? {
            return Err(question_not_found(id));
        }
        Ok(question)
    }

    /// Removes a question and pulls the quiz's end time back by one slot.
    pub async fn delete_question(&self, id: &str) -> AppResult<()> {
        let question = self.find_question(id).await?;
        if !self.questions.delete(id).await? {
            return Err(question_not_found(id));
        }

        if let Some(quiz) = self.quizzes.find_by_id(&question.quiz_id).await? {
            let count = self.questions.count_by_quiz(&quiz.id).await?;
            if let Some(end_time) = paced_end_time(&quiz, count, self.seconds_per_question)? {
                self.quizzes.set_end_time(&quiz.id, &end_time).await?;
            }
        }
        log::info!("Deleted question {} from quiz {}", id, question.quiz_id);
        Ok(())
    }

    async fn find_question(&self, id: &str) -> AppResult<Question> {
        self.questions
            .find_by_id(id)
            .await?
            .ok_or_else(|| question_not_found(id))
    }
}

/// End time a paced quiz must carry while it holds `question_count`
/// questions. `Ok(None)` for quizzes without a parseable start and for
/// practice quizzes, which are never paced.
pub(crate) fn paced_end_time(
    quiz: &Quiz,
    question_count: u64,
    seconds_per_question: u32,
) -> AppResult<Option<String>> {
    if quiz.quiz_type.is_practice() {
        return Ok(None);
    }
    let Some(start) = quiz.start_time.as_deref().and_then(parse_clock_time) else {
        return Ok(None);
    };

    end_time_for(start, question_count, seconds_per_question)
        .map(Some)
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} questions starting at {} would run past midnight",
                question_count,
                quiz.start_time.as_deref().unwrap_or_default()
            ))
        })
}

fn validate_question(request: &CreateQuestionRequest) -> AppResult<()> {
    request.validate()?;

    if request.correct_option_index as usize >= request.options.len() {
        return Err(AppError::ValidationError(format!(
            "correct_option_index {} is out of range for {} options",
            request.correct_option_index,
            request.options.len()
        )));
    }
    Ok(())
}

fn question_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Question with id '{}' not found", id))
}
