use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use quiz_core::model::{AttemptId, Category, Question, QuestionId, Quiz};
use quiz_core::scoring::ScoreReport;

use crate::error::SessionIssue;

//
// ─── STATUS ENUMS ──────────────────────────────────────────────────────────────
//

/// Progress of a list the session asked the catalog for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Empty,
    Failed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRequested => "not requested",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Empty => "empty",
            Self::Failed => "failed",
        })
    }
}

/// Where the session is in its lifecycle.
///
/// Derived from the session flags, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "questions", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    CategorySelected,
    QuizSelected(LoadStatus),
    InProgress,
    Finished,
    Reviewing,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::CategorySelected => f.write_str("choosing a quiz"),
            Self::QuizSelected(load) => write!(f, "waiting on questions ({load})"),
            Self::InProgress => f.write_str("in progress"),
            Self::Finished => f.write_str("finished"),
            Self::Reviewing => f.write_str("reviewing"),
        }
    }
}

/// Whether the finished attempt reached the attempt store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceStatus {
    #[default]
    NotRequested,
    Pending,
    Saved {
        id: i64,
    },
    Failed {
        message: String,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Everything the controller knows about the current session.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub(crate) category: Option<Category>,
    pub(crate) quizzes: Vec<Quiz>,
    pub(crate) quiz_list: LoadStatus,
    pub(crate) quiz: Option<Quiz>,
    pub(crate) questions: Vec<Question>,
    pub(crate) question_list: LoadStatus,
    pub(crate) current_index: usize,
    pub(crate) answers: HashMap<QuestionId, usize>,
    /// Questions that already contributed to `correct_count`.
    pub(crate) credited: HashSet<QuestionId>,
    pub(crate) started: bool,
    pub(crate) finished: bool,
    pub(crate) reviewing: bool,
    pub(crate) correct_count: u32,
    pub(crate) points: u32,
    pub(crate) reward_consumed: bool,
    pub(crate) report: Option<ScoreReport>,
    pub(crate) attempt_id: Option<AttemptId>,
    pub(crate) persistence: PersistenceStatus,
    pub(crate) issue: Option<SessionIssue>,
}

impl SessionState {
    pub(crate) fn phase(&self) -> SessionPhase {
        if self.reviewing {
            SessionPhase::Reviewing
        } else if self.finished {
            SessionPhase::Finished
        } else if self.started {
            SessionPhase::InProgress
        } else if self.quiz.is_some() {
            SessionPhase::QuizSelected(self.question_list)
        } else if self.category.is_some() {
            SessionPhase::CategorySelected
        } else {
            SessionPhase::Idle
        }
    }

    /// Drops per-attempt progress. The selected quiz and its questions stay.
    pub(crate) fn clear_attempt(&mut self) {
        self.current_index = 0;
        self.answers.clear();
        self.credited.clear();
        self.started = false;
        self.finished = false;
        self.reviewing = false;
        self.correct_count = 0;
        self.points = 0;
        self.reward_consumed = false;
        self.report = None;
        self.attempt_id = None;
        self.persistence = PersistenceStatus::NotRequested;
        self.issue = None;
    }

    pub(crate) fn clear_quiz(&mut self) {
        self.quiz = None;
        self.questions.clear();
        self.question_list = LoadStatus::NotRequested;
        self.clear_attempt();
    }

    pub(crate) fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub(crate) fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub(crate) fn question_total(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    /// Stores the latest answer for `question_id`.
    ///
    /// A question is credited at most once, on its first correct answer, and
    /// keeps the credit if later changed. Returns whether this call credited it.
    pub(crate) fn record_answer(
        &mut self,
        question_id: QuestionId,
        option: usize,
        is_correct: bool,
    ) -> bool {
        self.answers.insert(question_id, option);
        if is_correct && self.credited.insert(question_id) {
            self.correct_count += 1;
            return true;
        }
        false
    }
}
