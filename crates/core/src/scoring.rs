//! Scoring engine and attempt-completeness rule.
//!
//! Both the finish flow and the reward gate go through `is_complete_attempt`,
//! so there is exactly one definition of a "full" attempt.

use serde::{Deserialize, Serialize};

use crate::model::{AttemptId, QuizId};

/// Points awarded per correct answer unless settings override it.
pub const POINTS_PER_CORRECT_ANSWER: u32 = 10;

/// Final numbers for a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// Percentage of correct answers, rounded half-up.
    pub accuracy: u32,
    pub points: u32,
}

/// Score `correct` right answers out of `total` questions.
///
/// `correct` is clamped to `total`. A zero-question quiz reports 0% accuracy
/// instead of dividing by zero.
#[must_use]
pub fn score(total: u32, correct: u32, points_per_correct: u32) -> ScoreReport {
    let correct = correct.min(total);
    ScoreReport {
        total,
        correct,
        incorrect: total - correct,
        accuracy: accuracy_percent(total, correct),
        points: correct.saturating_mul(points_per_correct),
    }
}

/// `round(100 * correct / total)` with half-up rounding, in integer math.
#[must_use]
pub fn accuracy_percent(total: u32, correct: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    // correct <= total keeps this within 0..=100
    u32::try_from(rounded).unwrap_or(100)
}

/// The facts about an attempt that decide whether it counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    /// Questions actually loaded for the attempt.
    pub total_questions: u32,
    /// Canonical question count for the quiz.
    pub expected_questions: u32,
    pub finished: bool,
}

/// A finished attempt that ran over the canonical, non-empty question set.
#[must_use]
pub fn is_complete_attempt(attempt: &AttemptSummary) -> bool {
    attempt.finished
        && attempt.total_questions > 0
        && attempt.total_questions == attempt.expected_questions
}
