use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AnswerSnapshot, Question, QuizResult},
    repositories::{QuestionRepository, QuizRepository, QuizResultRepository},
};

const CORRECT_POINTS: f64 = 5.0;
const INCORRECT_POINTS: f64 = -2.0;
const NOT_ATTEMPTED_POINTS: f64 = -1.0;
const RUN_BONUS: f64 = 0.5;
const ALL_ATTEMPTED_BONUS: f64 = 30.0;

/// Aggregates for one graded answer sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub answers: Vec<AnswerSnapshot>,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub not_attempted_count: u32,
    pub base_points: f64,
    pub streak_bonus: f64,
    pub bonus_points: f64,
    pub points: f64,
    pub completion_percentage: f64,
}

/// Grades `answers` against the authoritative `questions`.
///
/// Questions are walked in order. A run of consecutive correct answers
/// earns half a point for every answer after the first; a run of
/// incorrect answers costs the same. Skipping a question breaks either run.
pub fn grade(questions: &[Question], answers: &[AnswerSnapshot]) -> Grade {
    let selected: HashMap<&str, Option<u32>> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a.selected_option_index))
        .collect();

    let mut snapshots = Vec::with_capacity(questions.len());
    let (mut correct, mut incorrect, mut skipped) = (0u32, 0u32, 0u32);
    let (mut correct_run, mut incorrect_run) = (0u32, 0u32);
    let mut base_points = 0.0;
    let mut streak_bonus = 0.0;

    for question in questions {
        let choice = selected.get(question.id.as_str()).copied().flatten();
        snapshots.push(AnswerSnapshot {
            question_id: question.id.clone(),
            selected_option_index: choice,
        });

        match choice {
            None => {
                skipped += 1;
                base_points += NOT_ATTEMPTED_POINTS;
                correct_run = 0;
                incorrect_run = 0;
            }
            Some(index) if question.is_correct(index) => {
                correct += 1;
                base_points += CORRECT_POINTS;
                correct_run += 1;
                incorrect_run = 0;
                if correct_run > 1 {
                    streak_bonus += RUN_BONUS;
                }
            }
            Some(_) => {
                incorrect += 1;
                base_points += INCORRECT_POINTS;
                incorrect_run += 1;
                correct_run = 0;
                if incorrect_run > 1 {
                    streak_bonus -= RUN_BONUS;
                }
            }
        }
    }

    // Vacuously true for a quiz without questions.
    let all_attempted = skipped == 0;
    let mut bonus_points = if all_attempted { ALL_ATTEMPTED_BONUS } else { 0.0 };
    bonus_points += band_rate(correct) * f64::from(correct);

    let total = questions.len();
    let completion_percentage = if total == 0 {
        0.0
    } else {
        round2(f64::from(correct + incorrect) / total as f64 * 100.0)
    };

    Grade {
        answers: snapshots,
        correct_count: correct,
        incorrect_count: incorrect,
        not_attempted_count: skipped,
        base_points,
        streak_bonus,
        bonus_points,
        points: base_points + streak_bonus + bonus_points,
        completion_percentage,
    }
}

// Per-correct-answer bonus, picked by the correct count's band.
fn band_rate(correct: u32) -> f64 {
    match correct {
        11..=20 => 0.5,
        21..=30 => 1.5,
        _ => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct ScoringService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn QuizResultRepository>,
}

impl ScoringService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn QuizResultRepository>,
    ) -> Self {
        Self {
            quizzes,
            questions,
            results,
        }
    }

    /// Grades and stores one submission. Scored quizzes accept a single
    /// submission per user; practice quizzes accept any number.
    pub async fn score(
        &self,
        quiz_id: &str,
        user_id: &str,
        answers: &[AnswerSnapshot],
        submitted_at: DateTime<Utc>,
    ) -> AppResult<QuizResult> {
        if Uuid::parse_str(quiz_id).is_err() {
            return Err(AppError::ValidationError("Invalid quiz id format".to_string()));
        }

        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;

        let questions = self.questions.find_by_quiz(quiz_id).await?;
        let grade = grade(&questions, answers);

        let submission_key = if quiz.quiz_type.is_practice() {
            None
        } else {
            Some(QuizResult::submission_key_for(user_id, quiz_id))
        };

        let result = QuizResult {
            id: QuizResult::new_id(),
            user_id: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            answers: grade.answers,
            correct_count: grade.correct_count,
            incorrect_count: grade.incorrect_count,
            not_attempted_count: grade.not_attempted_count,
            base_points: grade.base_points,
            streak_bonus: grade.streak_bonus,
            bonus_points: grade.bonus_points,
            points: grade.points,
            completion_percentage: grade.completion_percentage,
            submission_key,
            submitted_at,
        };

        let saved = self.results.create(result).await.map_err(|e| match e {
            AppError::AlreadyExists(_) => AppError::Conflict(format!(
                "Answers for quiz '{}' were already submitted",
                quiz.title
            )),
            other => other,
        })?;

        log::info!(
            "User {} scored {} on quiz {} ({}% complete)",
            user_id,
            saved.points,
            quiz_id,
            saved.completion_percentage
        );
        Ok(saved)
    }

    pub async fn results_for_user(&self, user_id: &str) -> AppResult<Vec<QuizResult>> {
        self.results.find_by_user(user_id).await
    }

    pub async fn get_result(&self, id: &str) -> AppResult<QuizResult> {
        self.results
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Result with id '{}' not found", id)))
    }
}
