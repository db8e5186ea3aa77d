#![forbid(unsafe_code)]

pub mod keys;
pub mod quiz_store;
pub mod repository;
pub mod sqlite;

pub use keys::StorageKey;
pub use quiz_store::QuizStore;
pub use repository::{InMemoryStore, KeyValueStore, StorageError};
pub use sqlite::{SqliteInitError, SqliteStore};
