use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::CategoryId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryError {
    #[error("category folder cannot be empty")]
    EmptyFolder,

    #[error("unknown difficulty tier: {0}")]
    UnknownDifficulty(String),
}

/// Difficulty tier shown next to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(CategoryError::UnknownDifficulty(other.to_owned())),
        }
    }
}

/// A topic the user can pick before choosing a quiz.
///
/// `folder` is the display grouping the catalog files the category under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    folder: String,
    difficulty: Difficulty,
    quiz_count: u32,
}

impl Category {
    /// # Errors
    ///
    /// Returns `CategoryError::EmptyFolder` if the folder is blank.
    pub fn new(
        id: CategoryId,
        folder: impl Into<String>,
        difficulty: Difficulty,
        quiz_count: u32,
    ) -> Result<Self, CategoryError> {
        let folder = folder.into().trim().to_owned();
        if folder.is_empty() {
            return Err(CategoryError::EmptyFolder);
        }
        Ok(Self {
            id,
            folder,
            difficulty,
            quiz_count,
        })
    }

    #[must_use]
    pub fn id(&self) -> CategoryId {
        self.id
    }

    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn quiz_count(&self) -> u32 {
        self.quiz_count
    }
}
