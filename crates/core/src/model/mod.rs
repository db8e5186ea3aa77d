mod ids;
mod ledger;
mod question;
mod result;
mod stats;

pub use ids::{ParseIdError, QuestionId};
pub use ledger::{AnswerLedger, LedgerError, completion_percent};
pub use question::{BankError, InvalidOptionKey, OptionKey, Question, QuestionBank};
pub use result::{CorrectAnswer, Grade, ScoreResult, WrongAnswer};
pub use stats::{ExamHistoryEntry, HISTORY_LIMIT, UserStats};

#[cfg(test)]
pub(crate) use question::fixtures;
