use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::repository::{KeyValueStore, StorageError};

mod migrate;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
    Flush(oneshot::Sender<()>),
}

/// `SQLite`-backed key/value store.
///
/// All rows are loaded when the store opens and reads are served from that
/// cache. Writes update the cache at once and are applied in order by a
/// background task, each inside its own transaction. Use
/// [`QuizStore::flush`](crate::QuizStore::flush) to wait for them.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    cache: Arc<Mutex<HashMap<String, String>>>,
    writes: mpsc::UnboundedSender<WriteOp>,
}

impl SqliteStore {
    /// Connect using a `SQLite` URL such as `sqlite:file:quiz?mode=memory&cache=shared`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid, the connection fails or
    /// the schema cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(SqliteConnectOptions::from_str(database_url)?).await
    }

    /// Open the database file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the file cannot be opened or migrated.
    pub async fn open(path: &Path) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;
        migrate::run_migrations(&pool).await?;

        let rows = sqlx::query("SELECT key, value FROM kv")
            .fetch_all(&pool)
            .await?;
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            entries.insert(key, value);
        }
        tracing::debug!(keys = entries.len(), "sqlite store opened");

        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(pool.clone(), rx));

        Ok(Self {
            pool,
            cache: Arc::new(Mutex::new(entries)),
            writes,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn enqueue(&self, op: WriteOp) -> Result<(), StorageError> {
        self.writes
            .send(op)
            .map_err(|_| StorageError::Unavailable("sqlite writer has stopped".into()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.enqueue(WriteOp::Set {
            key: key.to_owned(),
            value: value.to_owned(),
        })?;
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.enqueue(WriteOp::Remove {
            key: key.to_owned(),
        })?;
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    fn flush_signal(&self) -> Option<oneshot::Receiver<()>> {
        let (done, rx) = oneshot::channel();
        // a stopped writer drops `done`, which the receiver reports as an error
        let _ = self.enqueue(WriteOp::Flush(done));
        Some(rx)
    }
}

async fn run_writer(pool: SqlitePool, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { key, value } => {
                if let Err(err) = upsert(&pool, &key, &value).await {
                    tracing::warn!(key, error = %err, "sqlite write failed");
                }
            }
            WriteOp::Remove { key } => {
                if let Err(err) = delete(&pool, &key).await {
                    tracing::warn!(key, error = %err, "sqlite delete failed");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("sqlite writer finished");
}

async fn upsert(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r"
        INSERT INTO kv (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;
    tx.commit().await
}

async fn delete(pool: &SqlitePool, key: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM kv WHERE key = ?1")
        .bind(key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}
