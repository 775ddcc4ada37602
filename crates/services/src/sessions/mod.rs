mod controller;
mod events;
mod snapshot;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{Navigation, QuizSessionController, SubmitOutcome};
pub use events::SessionEvent;
pub use snapshot::SessionSnapshot;
pub use state::{LoadStatus, PersistenceStatus, SessionPhase};
