#![forbid(unsafe_code)]

pub mod bank;
pub mod config;
pub mod driver;
pub mod error;
pub mod sessions;
pub mod stats_service;
pub mod store;
pub mod telemetry;
pub mod ticker;

pub use quiz_core::Clock;
pub use sessions as session;

pub use bank::BankLoader;
pub use config::{BankLocation, QuizConfig};
pub use driver::{SessionCommand, SessionDriver, SessionEvent};
pub use error::{ConfigError, LoadError, SessionError, StoreError};
pub use sessions::{AnswerFeedback, QuizSession, SessionMode, SessionProgress, SessionTick};
pub use stats_service::StatsService;
pub use store::open_store;
pub use ticker::IntervalTicker;
