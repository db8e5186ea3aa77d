use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ExamHistoryEntry, HISTORY_LIMIT, UserStats};
use crate::scoring::round2;

/// Score swing (in percentage points) needed before a trend counts as a change.
pub const TREND_THRESHOLD: f64 = 5.0;

/// Fold one finished exam into the running statistics.
///
/// The average is recomputed from the retained history plus the new score
/// rather than updated incrementally.
#[must_use]
pub fn update(stats: &UserStats, score: f64, passed: bool, at: DateTime<Utc>) -> UserStats {
    let mut next = stats.clone();

    next.total_exams = next.total_exams.saturating_add(1);
    if passed {
        next.total_passed = next.total_passed.saturating_add(1);
    } else {
        next.total_failed = next.total_failed.saturating_add(1);
    }
    next.best_score = next.best_score.max(score);

    let retained: f64 = next.exam_history.iter().map(|e| e.score).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = (next.exam_history.len() + 1) as f64;
    next.average_score = round2((retained + score) / count);

    next.exam_history.insert(
        0,
        ExamHistoryEntry {
            date: at,
            score,
            passed,
        },
    );
    next.exam_history.truncate(HISTORY_LIMIT);
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    Insufficient,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::Insufficient => "neutral",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub trend: Trend,
    /// Latest minus previous score; `None` with fewer than two entries.
    pub difference: Option<f64>,
    pub message: String,
}

/// Compare the two most recent entries of a most-recent-first history.
#[must_use]
pub fn trend(history: &[ExamHistoryEntry]) -> TrendReport {
    let [latest, previous, ..] = history else {
        return TrendReport {
            trend: Trend::Insufficient,
            difference: None,
            message: "Not enough data to analyse yet".to_owned(),
        };
    };

    let difference = round2(latest.score - previous.score);
    let (trend, message) = if difference > TREND_THRESHOLD {
        (
            Trend::Improving,
            format!("Up {:.0} points from last time", difference),
        )
    } else if difference < -TREND_THRESHOLD {
        (
            Trend::Declining,
            format!("Down {:.0} points from last time", difference.abs()),
        )
    } else {
        (Trend::Stable, "Score is holding steady".to_owned())
    };

    TrendReport {
        trend,
        difference: Some(difference),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn scores(stats: &UserStats) -> Vec<f64> {
        stats.exam_history.iter().map(|e| e.score).collect()
    }

    #[test]
    fn three_updates_accumulate() {
        let now = fixed_now();
        let stats = UserStats::default();
        let stats = update(&stats, 60.0, false, now);
        let stats = update(&stats, 90.0, true, now);
        let stats = update(&stats, 80.0, true, now);

        assert_eq!(stats.total_exams, 3);
        assert_eq!(stats.total_passed, 2);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.best_score, 90.0);
        assert_eq!(stats.average_score, 76.67);
        assert_eq!(scores(&stats), vec![80.0, 90.0, 60.0]);
    }

    #[test]
    fn history_keeps_ten_most_recent() {
        let now = fixed_now();
        let mut stats = UserStats::default();
        for i in 0..12 {
            stats = update(&stats, f64::from(i * 5), i % 2 == 0, now);
        }
        assert_eq!(stats.total_exams, 12);
        assert_eq!(stats.exam_history.len(), HISTORY_LIMIT);
        assert_eq!(stats.exam_history[0].score, 55.0);
        assert_eq!(stats.exam_history[9].score, 10.0);
        assert_eq!(stats.best_score, 55.0);
    }

    #[test]
    fn update_does_not_touch_input() {
        let before = UserStats::default();
        let _ = update(&before, 70.0, true, fixed_now());
        assert_eq!(before, UserStats::default());
    }

    #[test]
    fn trend_thresholds() {
        let now = fixed_now();
        let entry = |score: f64| ExamHistoryEntry {
            date: now,
            score,
            passed: score >= 50.0,
        };

        assert_eq!(trend(&[]).trend, Trend::Insufficient);
        assert_eq!(trend(&[entry(80.0)]).trend, Trend::Insufficient);

        let improving = trend(&[entry(80.0), entry(70.0)]);
        assert_eq!(improving.trend, Trend::Improving);
        assert_eq!(improving.difference, Some(10.0));

        assert_eq!(trend(&[entry(60.0), entry(70.0)]).trend, Trend::Declining);
        assert_eq!(trend(&[entry(75.0), entry(70.0)]).trend, Trend::Stable);
        assert_eq!(trend(&[entry(65.0), entry(70.0)]).trend, Trend::Stable);
    }
}
