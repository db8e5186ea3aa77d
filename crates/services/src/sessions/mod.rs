mod mode;
mod progress;
mod service;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use mode::{QuestionSource, SessionKind, SessionMode};
pub use progress::SessionProgress;
pub use service::{AnswerFeedback, QuizSession, SessionTick};
