#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod reward;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{OfferError, Resource, RewardError, SessionError, SessionIssue};
pub use loader::{LoadMode, LoadOutcome, LoadPolicy, LoadStart, LoadTicket, ResourceLoader};
pub use reward::{GrantOutcome, OfferResult, Reward, RewardCoordinator, RewardedOfferProvider};
pub use sessions::{
    LoadStatus, Navigation, PersistenceStatus, QuizSessionController, SessionEvent, SessionPhase,
    SessionSnapshot, SubmitOutcome,
};
