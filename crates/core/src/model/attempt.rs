use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuizId;
use crate::scoring::ScoreReport;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptRecordError {
    #[error("score {0} is above 100")]
    ScoreOutOfRange(u32),
}

/// What gets handed to the attempt store once a quiz is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    quiz_id: QuizId,
    score: u32,
    correct_answers: u32,
    incorrect_answers: u32,
    points: u32,
    completed: bool,
    completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Build a record from a finished attempt's score report.
    #[must_use]
    pub fn from_report(
        quiz_id: QuizId,
        report: &ScoreReport,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            quiz_id,
            score: report.accuracy,
            correct_answers: report.correct,
            incorrect_answers: report.incorrect,
            points: report.points,
            completed,
            completed_at,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptRecordError::ScoreOutOfRange` if `score` is not a percentage.
    pub fn from_persisted(
        quiz_id: QuizId,
        score: u32,
        correct_answers: u32,
        incorrect_answers: u32,
        points: u32,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptRecordError> {
        if score > 100 {
            return Err(AttemptRecordError::ScoreOutOfRange(score));
        }
        Ok(Self {
            quiz_id,
            score,
            correct_answers,
            incorrect_answers,
            points,
            completed,
            completed_at,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    /// Accuracy percentage, 0..=100.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
