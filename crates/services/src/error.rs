//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{BankError, QuestionId};
use storage::SqliteInitError;

/// The question bank could not be loaded. Terminal for session start-up; never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Invalid(#[from] BankError),
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already submitted")]
    Completed,
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("question {0} is already answered and cannot be changed")]
    AnswerLocked(QuestionId),
    #[error("this session has no timer")]
    NoTimer,
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// The persistent store named by `QuizConfig::data_dir` could not be opened.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to create data directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
