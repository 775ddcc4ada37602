//! Shared error types for the services crate.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use quiz_core::model::{CategoryId, QuestionId, QuizId};

use crate::sessions::SessionPhase;

/// Errors emitted by `QuizSessionController` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while the session is {phase}")]
    InvalidStateTransition {
        operation: &'static str,
        phase: SessionPhase,
    },
    #[error("quiz {quiz_id} does not belong to category {category_id}")]
    QuizOutsideCategory {
        quiz_id: QuizId,
        category_id: CategoryId,
    },
    #[error("question {0} is not part of the loaded quiz")]
    UnknownQuestion(QuestionId),
    #[error("option {option} is out of range for question {question_id}")]
    InvalidOption {
        question_id: QuestionId,
        option: usize,
    },
    #[error("there is no empty or failed load to retry")]
    NothingToRetry,
}

/// Errors emitted by a `RewardedOfferProvider`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OfferError {
    #[error("rewarded offer unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted while granting a bonus reward.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RewardError {
    #[error("attempt is not eligible for a bonus")]
    NotEligible,
    #[error("rewarded offer was not completed")]
    Declined,
    #[error(transparent)]
    Offer(#[from] OfferError),
}

/// A list the session loads from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "list", content = "id", rename_all = "snake_case")]
pub enum Resource {
    Quizzes(CategoryId),
    Questions(QuizId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quizzes(id) => write!(f, "quizzes of category {id}"),
            Self::Questions(id) => write!(f, "questions of quiz {id}"),
        }
    }
}

/// Problems the session surfaces to the presentation layer.
///
/// Unlike `SessionError`, these are not returned from a call: they come from
/// background work and stay on the session until it moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionIssue {
    LoadFailure {
        resource: Resource,
        attempts: u32,
        message: String,
    },
    EmptyResult {
        resource: Resource,
    },
    PersistenceFailure {
        message: String,
    },
    RewardFailure {
        message: String,
    },
}

impl fmt::Display for SessionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailure {
                resource,
                attempts,
                message,
            } => write!(f, "loading {resource} failed after {attempts} attempts: {message}"),
            Self::EmptyResult { resource } => write!(f, "no {resource} are available"),
            Self::PersistenceFailure { message } => write!(f, "attempt was not saved: {message}"),
            Self::RewardFailure { message } => write!(f, "bonus was not granted: {message}"),
        }
    }
}
