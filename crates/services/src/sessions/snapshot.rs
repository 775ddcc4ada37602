use std::collections::BTreeMap;

use serde::Serialize;

use quiz_core::model::{AttemptId, Category, Question, QuestionId, Quiz};
use quiz_core::scoring::ScoreReport;

use super::state::{LoadStatus, PersistenceStatus, SessionPhase};
use crate::error::SessionIssue;

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub category: Option<Category>,
    pub quizzes: Vec<Quiz>,
    pub quiz_list: LoadStatus,
    pub quiz: Option<Quiz>,
    pub questions: Vec<Question>,
    pub question_list: LoadStatus,
    pub current_index: usize,
    pub answers: BTreeMap<QuestionId, usize>,
    pub correct_answers: u32,
    /// Score points plus any granted bonus.
    pub points: u32,
    pub score: Option<ScoreReport>,
    pub attempt_id: Option<AttemptId>,
    pub reward_consumed: bool,
    pub can_offer_bonus: bool,
    pub persistence: PersistenceStatus,
    pub issue: Option<SessionIssue>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<usize> {
        self.answers.get(&question_id).copied()
    }

    /// `None` while the question is unanswered.
    #[must_use]
    pub fn answered_correctly(&self, question: &Question) -> Option<bool> {
        self.answer_for(question.id())
            .map(|option| question.is_correct(option))
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }
}
