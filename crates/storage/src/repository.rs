use async_trait::async_trait;
use quiz_core::model::{AttemptRecord, Category, CategoryId, Question, QuestionId, Quiz, QuizId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read side of the content catalog, plus the upserts used to seed it.
///
/// Listing calls return items in catalog order (ascending id); the session
/// controller relies on that order when it auto-selects the first quiz.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning category is missing.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning quiz is missing.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// List quizzes for a category. An unknown category yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quizzes(&self, category_id: CategoryId) -> Result<Vec<Quiz>, StorageError>;

    /// List questions for a quiz. An unknown quiz yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError>;
}

/// A persisted attempt with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: i64,
    pub record: AttemptRecord,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, record: AttemptRecord) -> Self {
        Self { id, record }
    }
}

/// Store for finished attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a finished attempt and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Most recent attempts for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_attempts(&self, quiz_id: QuizId, limit: u32)
    -> Result<Vec<AttemptRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    categories: Arc<Mutex<BTreeMap<CategoryId, Category>>>,
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        let mut guard = self.categories.lock().map_err(poisoned)?;
        guard.insert(category.id(), category.clone());
        Ok(())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let known = self
            .categories
            .lock()
            .map_err(poisoned)?
            .contains_key(&quiz.category_id());
        if !known {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let known = self
            .quizzes
            .lock()
            .map_err(poisoned)?
            .contains_key(&question.quiz_id());
        if !known {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let guard = self.categories.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    async fn list_quizzes(&self, category_id: CategoryId) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|q| q.category_id() == category_id)
            .cloned()
            .collect())
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|q| q.quiz_id() == quiz_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn list_attempts(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .rev()
            .filter(|row| row.record.quiz_id() == quiz_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Bundles the catalog and attempt store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { catalog, attempts }
    }
}
