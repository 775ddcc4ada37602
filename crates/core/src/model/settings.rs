use std::time::Duration;

use thiserror::Error;

use crate::scoring::POINTS_PER_CORRECT_ANSWER;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("load attempts must be > 0")]
    InvalidLoadAttempts,

    #[error("load attempts must be <= {max}")]
    TooManyLoadAttempts { max: u32 },

    #[error("retry delay must be <= 60 seconds")]
    InvalidRetryDelay,

    #[error("points per correct answer must be > 0")]
    InvalidPointsPerCorrect,

    #[error("required question count must be > 0")]
    InvalidRequiredQuestionCount,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

const MAX_LOAD_ATTEMPTS: u32 = 10;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Tuning knobs for loading, scoring and reward eligibility.
///
/// Defaults:
/// - 3 load attempts, 1s apart (fixed delay, the catalog warms up slowly)
/// - one re-check 1.5s after an empty result
/// - forced question refetch if nothing arrived after 2s
/// - loaded lists stay fresh for 5 minutes
/// - 10 points per correct answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    load_attempts: u32,
    retry_delay: Duration,
    empty_recheck_delay: Duration,
    question_fallback_delay: Duration,
    cache_ttl: Duration,
    points_per_correct: u32,
    required_question_count: Option<u32>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            load_attempts: 3,
            retry_delay: Duration::from_secs(1),
            empty_recheck_delay: Duration::from_millis(1_500),
            question_fallback_delay: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(5 * 60),
            points_per_correct: POINTS_PER_CORRECT_ANSWER,
            required_question_count: None,
        }
    }
}

impl QuizSettings {
    #[must_use]
    pub fn load_attempts(&self) -> u32 {
        self.load_attempts
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    #[must_use]
    pub fn empty_recheck_delay(&self) -> Duration {
        self.empty_recheck_delay
    }

    #[must_use]
    pub fn question_fallback_delay(&self) -> Duration {
        self.question_fallback_delay
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn points_per_correct(&self) -> u32 {
        self.points_per_correct
    }

    /// Question count a finished attempt must have to count as complete.
    ///
    /// `None` means the quiz's own declared count is used.
    #[must_use]
    pub fn required_question_count(&self) -> Option<u32> {
        self.required_question_count
    }

    #[must_use]
    pub fn to_draft(&self) -> QuizSettingsDraft {
        QuizSettingsDraft {
            load_attempts: self.load_attempts,
            retry_delay: self.retry_delay,
            empty_recheck_delay: self.empty_recheck_delay,
            question_fallback_delay: self.question_fallback_delay,
            cache_ttl: self.cache_ttl,
            points_per_correct: self.points_per_correct,
            required_question_count: self.required_question_count,
        }
    }
}

/// Unvalidated settings, typically assembled from env vars or CLI flags.
#[derive(Debug, Clone)]
pub struct QuizSettingsDraft {
    pub load_attempts: u32,
    pub retry_delay: Duration,
    pub empty_recheck_delay: Duration,
    pub question_fallback_delay: Duration,
    pub cache_ttl: Duration,
    pub points_per_correct: u32,
    pub required_question_count: Option<u32>,
}

impl Default for QuizSettingsDraft {
    fn default() -> Self {
        QuizSettings::default().to_draft()
    }
}

impl QuizSettingsDraft {
    /// # Errors
    ///
    /// Returns `SettingsError` if any knob is outside its accepted range.
    pub fn validate(self) -> Result<QuizSettings, SettingsError> {
        if self.load_attempts == 0 {
            return Err(SettingsError::InvalidLoadAttempts);
        }
        if self.load_attempts > MAX_LOAD_ATTEMPTS {
            return Err(SettingsError::TooManyLoadAttempts {
                max: MAX_LOAD_ATTEMPTS,
            });
        }
        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(SettingsError::InvalidRetryDelay);
        }
        if self.points_per_correct == 0 {
            return Err(SettingsError::InvalidPointsPerCorrect);
        }
        if self.required_question_count == Some(0) {
            return Err(SettingsError::InvalidRequiredQuestionCount);
        }

        Ok(QuizSettings {
            load_attempts: self.load_attempts,
            retry_delay: self.retry_delay,
            empty_recheck_delay: self.empty_recheck_delay,
            question_fallback_delay: self.question_fallback_delay,
            cache_ttl: self.cache_ttl,
            points_per_correct: self.points_per_correct,
            required_question_count: self.required_question_count,
        })
    }
}
