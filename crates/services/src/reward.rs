use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quiz_core::model::AttemptId;
use quiz_core::scoring::{AttemptSummary, is_complete_attempt};

use crate::error::{OfferError, RewardError};

/// Bonus points granted on top of an attempt's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub amount: u32,
}

/// What the rewarded offer reported when it closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferResult {
    pub granted: bool,
    pub amount: u32,
}

/// External collaborator that shows a rewarded offer to the player.
#[async_trait]
pub trait RewardedOfferProvider: Send + Sync {
    async fn show_rewarded_offer(&self) -> Result<OfferResult, OfferError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted { amount: u32 },
    /// The attempt already received its bonus; nothing changed.
    AlreadyGranted { amount: u32 },
}

impl GrantOutcome {
    #[must_use]
    pub fn amount(&self) -> u32 {
        match self {
            Self::Granted { amount } | Self::AlreadyGranted { amount } => *amount,
        }
    }
}

/// Tracks the one bonus a finished attempt may receive.
#[derive(Debug, Default)]
pub struct RewardCoordinator {
    granted: Option<(AttemptId, u32)>,
}

impl RewardCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount already granted to `attempt_id`, if any.
    #[must_use]
    pub fn granted_amount(&self, attempt_id: AttemptId) -> Option<u32> {
        self.granted
            .filter(|(granted_to, _)| *granted_to == attempt_id)
            .map(|(_, amount)| amount)
    }

    #[must_use]
    pub fn can_offer(&self, attempt: &AttemptSummary) -> bool {
        is_complete_attempt(attempt) && self.granted_amount(attempt.attempt_id).is_none()
    }

    /// Grants `reward` to `attempt` at most once.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::NotEligible` if the attempt is unfinished or partial.
    pub fn grant(
        &mut self,
        attempt: &AttemptSummary,
        reward: Reward,
    ) -> Result<GrantOutcome, RewardError> {
        if let Some(amount) = self.granted_amount(attempt.attempt_id) {
            log::debug!("bonus already granted to attempt {}", attempt.attempt_id);
            return Ok(GrantOutcome::AlreadyGranted { amount });
        }
        if !is_complete_attempt(attempt) {
            return Err(RewardError::NotEligible);
        }

        self.granted = Some((attempt.attempt_id, reward.amount));
        Ok(GrantOutcome::Granted {
            amount: reward.amount,
        })
    }
}
