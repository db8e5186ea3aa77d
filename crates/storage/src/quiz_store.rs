//! Typed access to the persisted quiz state.
//!
//! Every operation degrades instead of failing: read problems yield the
//! default value, write problems are logged and reported as `false`, so a
//! session keeps working without durability.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use quiz_core::model::{AnswerLedger, Question, UserStats};
use quiz_core::timer::TimerSnapshot;

use crate::keys::StorageKey;
use crate::repository::{InMemoryStore, KeyValueStore, StorageError};

const AVAILABILITY_KEY: &str = "__storage_check__";

#[derive(Clone)]
pub struct QuizStore {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for QuizStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizStore").finish_non_exhaustive()
    }
}

impl QuizStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    //
    // ─── GENERIC JSON ACCESS ──────────────────────────────────────────────────
    //

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage read failed; using default");
                None
            }
        }
    }

    fn write_raw(&self, key: &str, value: &str) -> bool {
        match self.kv.set(key, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage write failed");
                false
            }
        }
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_raw(key, &raw),
            Err(err) => {
                let err = StorageError::Serialization(err.to_string());
                tracing::warn!(key, error = %err, "could not encode value");
                false
            }
        }
    }

    /// Load and decode the JSON stored under `key`. Absent or unreadable values yield `None`.
    #[must_use]
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding unreadable stored value");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.kv.remove(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage remove failed");
                false
            }
        }
    }

    //
    // ─── LEDGERS ──────────────────────────────────────────────────────────────
    //

    fn save_ledger(&self, key: StorageKey, ledger: &AnswerLedger) -> bool {
        match ledger.to_blob() {
            Ok(blob) => self.write_raw(key.as_str(), &blob),
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "could not encode answers");
                false
            }
        }
    }

    fn load_ledger(&self, key: StorageKey) -> AnswerLedger {
        AnswerLedger::restore(self.read_raw(key.as_str()).as_deref())
    }

    pub fn save_practice_progress(&self, ledger: &AnswerLedger) -> bool {
        self.save_ledger(StorageKey::PracticeProgress, ledger)
    }

    #[must_use]
    pub fn load_practice_progress(&self) -> AnswerLedger {
        self.load_ledger(StorageKey::PracticeProgress)
    }

    pub fn clear_practice_progress(&self) -> bool {
        self.remove(StorageKey::PracticeProgress.as_str())
    }

    pub fn save_exam_answers(&self, ledger: &AnswerLedger) -> bool {
        self.save_ledger(StorageKey::ExamAnswers, ledger)
    }

    #[must_use]
    pub fn load_exam_answers(&self) -> AnswerLedger {
        self.load_ledger(StorageKey::ExamAnswers)
    }

    //
    // ─── EXAM SESSION ─────────────────────────────────────────────────────────
    //

    pub fn save_exam_questions(&self, questions: &[Question]) -> bool {
        self.save_json(StorageKey::ExamQuestions.as_str(), questions)
    }

    /// The persisted exam subset, if a non-empty one exists.
    #[must_use]
    pub fn load_exam_questions(&self) -> Option<Vec<Question>> {
        self.load_json::<Vec<Question>>(StorageKey::ExamQuestions.as_str())
            .filter(|questions| !questions.is_empty())
    }

    pub fn save_exam_start_time(&self, started_at: DateTime<Utc>) -> bool {
        self.save_json(StorageKey::ExamStartTime.as_str(), &started_at.timestamp_millis())
    }

    #[must_use]
    pub fn load_exam_start_time(&self) -> Option<DateTime<Utc>> {
        self.load_json::<i64>(StorageKey::ExamStartTime.as_str())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn save_exam_time_left(&self, snapshot: &TimerSnapshot) -> bool {
        self.save_timer_state(StorageKey::ExamTimeLeft.as_str(), snapshot)
    }

    #[must_use]
    pub fn load_exam_time_left(&self, now: DateTime<Utc>) -> Option<TimerSnapshot> {
        self.load_timer_state(StorageKey::ExamTimeLeft.as_str(), now)
    }

    /// Remove every exam key (answers, subset, start time, time left).
    pub fn clear_exam_data(&self) -> bool {
        StorageKey::EXAM
            .iter()
            .fold(true, |ok, key| self.remove(key.as_str()) && ok)
    }

    //
    // ─── TIMER STATE ──────────────────────────────────────────────────────────
    //

    pub fn save_timer_state(&self, key: &str, snapshot: &TimerSnapshot) -> bool {
        self.save_json(key, snapshot)
    }

    /// Load a timer snapshot with the time elapsed since it was saved already subtracted.
    #[must_use]
    pub fn load_timer_state(&self, key: &str, now: DateTime<Utc>) -> Option<TimerSnapshot> {
        self.load_json::<TimerSnapshot>(key)
            .map(|snapshot| snapshot.caught_up(now))
    }

    pub fn clear_timer_state(&self, key: &str) -> bool {
        self.remove(key)
    }

    //
    // ─── USER STATS ───────────────────────────────────────────────────────────
    //

    pub fn save_user_stats(&self, stats: &UserStats) -> bool {
        self.save_json(StorageKey::UserStats.as_str(), stats)
    }

    #[must_use]
    pub fn load_user_stats(&self) -> UserStats {
        self.load_json(StorageKey::UserStats.as_str())
            .unwrap_or_default()
    }

    //
    // ─── HOUSEKEEPING ─────────────────────────────────────────────────────────
    //

    /// Remove every quiz key.
    pub fn clear_all(&self) -> bool {
        StorageKey::ALL
            .iter()
            .fold(true, |ok, key| self.remove(key.as_str()) && ok)
    }

    /// Wait until queued writes have reached the backend.
    ///
    /// Returns `false` if the backend stopped before confirming.
    pub async fn flush(&self) -> bool {
        let Some(done) = self.kv.flush_signal() else {
            return true;
        };
        let flushed = done.await.is_ok();
        if !flushed {
            tracing::warn!("storage stopped before pending writes were confirmed");
        }
        flushed
    }

    /// Check the backend with a throwaway write.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let ok = self.kv.set(AVAILABILITY_KEY, "check").is_ok()
            && self.kv.remove(AVAILABILITY_KEY).is_ok();
        if !ok {
            tracing::warn!("persistent storage is not available");
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{OptionKey, QuestionId};
    use quiz_core::time::fixed_now;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }

    #[test]
    fn ledgers_round_trip_under_separate_keys() {
        let store = QuizStore::in_memory();
        let mut practice = AnswerLedger::new();
        practice.record(QuestionId::new(1), OptionKey::A);
        let mut exam = AnswerLedger::new();
        exam.record(QuestionId::new(2), OptionKey::D);

        assert!(store.save_practice_progress(&practice));
        assert!(store.save_exam_answers(&exam));
        assert_eq!(store.load_practice_progress(), practice);
        assert_eq!(store.load_exam_answers(), exam);

        assert!(store.clear_practice_progress());
        assert!(store.load_practice_progress().is_empty());
        assert_eq!(store.load_exam_answers(), exam);
    }

    #[test]
    fn absent_keys_mean_no_prior_state() {
        let store = QuizStore::in_memory();
        assert!(store.load_exam_questions().is_none());
        assert!(store.load_exam_start_time().is_none());
        assert!(store.load_exam_time_left(fixed_now()).is_none());
        assert_eq!(store.load_user_stats(), UserStats::default());
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let kv = Arc::new(InMemoryStore::new());
        let store = QuizStore::new(kv.clone());
        kv.set(StorageKey::UserStats.as_str(), "{broken").unwrap();
        kv.set(StorageKey::PracticeProgress.as_str(), "[1,2]").unwrap();
        assert_eq!(store.load_user_stats(), UserStats::default());
        assert!(store.load_practice_progress().is_empty());
    }

    #[test]
    fn timer_state_catches_up_on_load() {
        let store = QuizStore::in_memory();
        let saved_at = fixed_now();
        assert!(store.save_timer_state("t", &TimerSnapshot::new(100, saved_at)));

        let later = saved_at + chrono::Duration::seconds(65);
        let loaded = store.load_timer_state("t", later).unwrap();
        assert_eq!(loaded.time_left, 35);

        let too_late = saved_at + chrono::Duration::seconds(101);
        assert_eq!(store.load_timer_state("t", too_late).unwrap().time_left, 0);
    }

    #[test]
    fn clear_exam_data_keeps_practice_and_stats() {
        let store = QuizStore::in_memory();
        let mut ledger = AnswerLedger::new();
        ledger.record(QuestionId::new(1), OptionKey::B);
        store.save_practice_progress(&ledger);
        store.save_exam_answers(&ledger);
        store.save_exam_start_time(fixed_now());
        store.save_exam_time_left(&TimerSnapshot::new(10, fixed_now()));
        store.save_user_stats(&UserStats {
            total_exams: 1,
            ..UserStats::default()
        });

        assert!(store.clear_exam_data());
        assert!(store.load_exam_answers().is_empty());
        assert!(store.load_exam_start_time().is_none());
        assert_eq!(store.load_practice_progress(), ledger);
        assert_eq!(store.load_user_stats().total_exams, 1);

        assert!(store.clear_all());
        assert!(store.load_practice_progress().is_empty());
        assert_eq!(store.load_user_stats().total_exams, 0);
    }

    #[test]
    fn start_time_round_trips_at_millisecond_precision() {
        let store = QuizStore::in_memory();
        let at = fixed_now() + chrono::Duration::milliseconds(250);
        store.save_exam_start_time(at);
        assert_eq!(store.load_exam_start_time(), Some(at));
    }

    #[tokio::test]
    async fn flush_on_synchronous_backend_returns_immediately() {
        let store = QuizStore::in_memory();
        store.save_exam_start_time(fixed_now());
        assert!(store.flush().await);
    }

    #[test]
    fn broken_backend_degrades_gracefully() {
        let store = QuizStore::new(Arc::new(BrokenStore));
        assert!(!store.is_available());
        assert!(!store.save_user_stats(&UserStats::default()));
        assert_eq!(store.load_user_stats(), UserStats::default());
        assert!(store.load_practice_progress().is_empty());
        assert!(!store.clear_exam_data());
    }
}
