use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of past exams kept in [`UserStats::exam_history`].
pub const HISTORY_LIMIT: usize = 10;

/// One finished exam as remembered in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamHistoryEntry {
    pub date: DateTime<Utc>,
    pub score: f64,
    pub passed: bool,
}

/// Running statistics across exam attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_exams: u32,
    pub total_passed: u32,
    pub total_failed: u32,
    pub best_score: f64,
    pub average_score: f64,
    /// Most recent first.
    pub exam_history: Vec<ExamHistoryEntry>,
}

impl UserStats {
    /// Score of the most recent exam, if any.
    #[must_use]
    pub fn last_score(&self) -> Option<f64> {
        self.exam_history.first().map(|e| e.score)
    }

    /// Share of exams passed, 0–100 rounded to a whole number.
    #[must_use]
    pub fn pass_rate(&self) -> u32 {
        if self.total_exams == 0 {
            return 0;
        }
        let rate = 100.0 * f64::from(self.total_passed) / f64::from(self.total_exams);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = rate.round() as u32;
        rounded
    }
}
