use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::ids::QuestionId;
use crate::model::question::OptionKey;

//
// ─── GRADE ────────────────────────────────────────────────────────────────────
//

/// Categorical label derived from a score percentage.
///
/// Bands are inclusive at their lower edge:
/// - `Excellent`: 90 and above
/// - `Good`: 80 and above
/// - `Fair`: 70 and above
/// - `Average`: 50 and above
/// - `Weak`: below 50
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    Average,
    Weak,
}

impl Grade {
    /// Map a percentage to its band, evaluated top-down.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Grade::Excellent
        } else if percentage >= 80.0 {
            Grade::Good
        } else if percentage >= 70.0 {
            Grade::Fair
        } else if percentage >= 50.0 {
            Grade::Average
        } else {
            Grade::Weak
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::Fair => "Fair",
            Grade::Average => "Average",
            Grade::Weak => "Weak",
        }
    }

    /// Study advice shown next to a result.
    #[must_use]
    pub fn recommendation(self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent! You have mastered the material.",
            Grade::Good => "Well done! Keep reviewing to push your score higher.",
            Grade::Fair => "Fairly good. Go over the questions you missed to improve.",
            Grade::Average => "Passed. Spend more time on your weaker topics.",
            Grade::Weak => "Keep at it. Review the whole question bank again carefully.",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//
// ─── PER-QUESTION DETAIL ──────────────────────────────────────────────────────
//

/// A question that was answered wrongly or skipped, with enough context for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongAnswer {
    /// 1-based position in the scored question list.
    pub number: usize,
    pub question_id: QuestionId,
    pub question: String,
    /// `None` when the question was left unanswered.
    pub user_answer: Option<OptionKey>,
    pub correct_answer: OptionKey,
    pub options: BTreeMap<OptionKey, String>,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectAnswer {
    pub number: usize,
    pub question_id: QuestionId,
    pub question: String,
    pub answer: OptionKey,
}

//
// ─── SCORE RESULT ─────────────────────────────────────────────────────────────
//

/// Outcome of scoring a ledger against a question list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub correct_count: usize,
    pub wrong_count: usize,
    pub skipped_count: usize,
    pub total_questions: usize,
    /// 0–100, rounded to two decimals.
    pub percentage: f64,
    pub grade: Grade,
    pub passed: bool,
    pub wrong_answers: Vec<WrongAnswer>,
    pub correct_answers: Vec<CorrectAnswer>,
}

impl ScoreResult {
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.correct_count + self.wrong_count
    }
}
