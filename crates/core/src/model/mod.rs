mod attempt;
mod ids;
pub mod progress;
mod word;

pub use attempt::{AttemptError, AttemptFacts, AttemptLog, Confidence};
pub use ids::{ParseIdError, UserId, WordId};
pub use progress::{ProgressError, ProgressRecord};
pub use word::{ValidatedWord, Word, WordDraft, WordStatus, WordValidationError};
