use quiz_core::model::{AttemptId, CategoryId, Question, Quiz, QuizId};
use storage::repository::StorageError;

use crate::error::Resource;
use crate::loader::{LoadOutcome, LoadTicket};

/// Completion of background work, routed back into the controller.
#[derive(Debug)]
pub(crate) enum ControllerEvent {
    QuizzesResolved {
        category_id: CategoryId,
        ticket: LoadTicket,
        outcome: LoadOutcome<Quiz>,
    },
    QuestionsResolved {
        quiz_id: QuizId,
        ticket: LoadTicket,
        outcome: LoadOutcome<Question>,
    },
    /// The fallback timer for `quiz_id` elapsed.
    QuestionsOverdue { quiz_id: QuizId },
    AttemptPersisted {
        attempt_id: AttemptId,
        result: Result<i64, StorageError>,
    },
}

/// Something the session did on its own, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent {
    QuizzesLoaded {
        category_id: CategoryId,
        count: usize,
    },
    QuizAutoSelected {
        quiz_id: QuizId,
    },
    QuestionsLoaded {
        quiz_id: QuizId,
        count: usize,
    },
    Started {
        quiz_id: QuizId,
        attempt_id: AttemptId,
    },
    EmptyResult {
        resource: Resource,
    },
    LoadFailed {
        resource: Resource,
        attempts: u32,
        message: String,
    },
    StaleResultDiscarded {
        resource: Resource,
    },
    QuestionRefetchForced {
        quiz_id: QuizId,
    },
    AttemptSaved {
        attempt_id: AttemptId,
        id: i64,
    },
    AttemptNotSaved {
        attempt_id: AttemptId,
        message: String,
    },
}
