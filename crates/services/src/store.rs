use std::sync::Arc;

use storage::{QuizStore, SqliteStore};

use crate::config::QuizConfig;
use crate::error::StoreError;

pub const DATABASE_FILE: &str = "quiz.sqlite3";

/// Open the store named by `config.data_dir`, or an in-memory one when unset.
///
/// # Errors
///
/// Returns `StoreError` if the directory cannot be created or the database
/// cannot be opened.
pub async fn open_store(config: &QuizConfig) -> Result<QuizStore, StoreError> {
    let Some(dir) = &config.data_dir else {
        tracing::info!("no data directory configured, quiz state stays in memory");
        return Ok(QuizStore::in_memory());
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
    let path = dir.join(DATABASE_FILE);
    let sqlite = SqliteStore::open(&path).await?;
    tracing::info!(path = %path.display(), "quiz store opened");
    Ok(QuizStore::new(Arc::new(sqlite)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("quiz-open-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn without_data_dir_state_is_not_shared() {
        let config = QuizConfig::default();
        let first = open_store(&config).await.unwrap();
        assert!(first.save_json("marker", &1_u32));

        let second = open_store(&config).await.unwrap();
        assert_eq!(second.load_json::<u32>("marker"), None);
    }

    #[tokio::test]
    async fn data_dir_is_created_and_survives_reopening() {
        let dir = temp_dir().join("nested");
        let config = QuizConfig {
            data_dir: Some(dir.clone()),
            ..QuizConfig::default()
        };

        let store = open_store(&config).await.unwrap();
        assert!(dir.join(DATABASE_FILE).exists());
        assert!(store.save_json("marker", &7_u32));
        assert!(store.flush().await);
        drop(store);

        let reopened = open_store(&config).await.unwrap();
        assert_eq!(reopened.load_json::<u32>("marker"), Some(7));

        let _ = std::fs::remove_dir_all(dir.parent().unwrap_or(&dir));
    }

    #[tokio::test]
    async fn data_dir_over_a_file_is_an_io_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("taken");
        std::fs::write(&blocker, b"x").unwrap();

        let config = QuizConfig {
            data_dir: Some(blocker),
            ..QuizConfig::default()
        };
        let err = open_store(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        let _ = std::fs::remove_dir_all(dir);
    }
}
