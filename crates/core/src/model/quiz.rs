use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,
}

/// A fixed sequence of questions belonging to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    category_id: CategoryId,
    title: String,
    question_count: u32,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is blank.
    pub fn new(
        id: QuizId,
        category_id: CategoryId,
        title: impl Into<String>,
        question_count: u32,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        Ok(Self {
            id,
            category_id,
            title,
            question_count,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of questions the catalog declares for this quiz.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }
}
