use quiz_core::Clock;
use quiz_core::model::UserStats;
use quiz_core::stats::{self, TrendReport};
use storage::QuizStore;

/// Read-modify-write access to the persisted [`UserStats`].
#[derive(Clone)]
pub struct StatsService {
    store: QuizStore,
    clock: Clock,
}

impl StatsService {
    #[must_use]
    pub fn new(store: QuizStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Current stats, or zeroed defaults when nothing is stored.
    #[must_use]
    pub fn current(&self) -> UserStats {
        self.store.load_user_stats()
    }

    /// Fold one exam result into the stored stats and persist the whole value.
    pub fn record(&self, score: f64, passed: bool) -> UserStats {
        let previous = self.store.load_user_stats();
        let updated = stats::update(&previous, score, passed, self.clock.now());
        if !self.store.save_user_stats(&updated) {
            tracing::warn!("exam stats could not be persisted");
        }
        tracing::info!(
            total_exams = updated.total_exams,
            best = updated.best_score,
            "stats updated"
        );
        updated
    }

    #[must_use]
    pub fn trend(&self) -> TrendReport {
        stats::trend(&self.current().exam_history)
    }
}
