mod attempt;
mod category;
mod ids;
mod question;
mod quiz;
mod settings;

pub use ids::{AttemptId, CategoryId, ParseIdError, QuestionId, QuizId};

pub use attempt::{AttemptRecord, AttemptRecordError};
pub use category::{Category, CategoryError, Difficulty};
pub use question::{OPTIONS_PER_QUESTION, Question, QuestionError};
pub use quiz::{Quiz, QuizError};
pub use settings::{QuizSettings, QuizSettingsDraft, SettingsError};
