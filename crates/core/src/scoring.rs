use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{
    AnswerLedger, CorrectAnswer, Grade, OptionKey, Question, ScoreResult, WrongAnswer,
};

/// Minimum percentage that counts as a pass.
pub const PASS_THRESHOLD: f64 = 50.0;

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_percent(part: usize, whole: usize) -> u32 {
    percent(part, whole).round() as u32
}

//
// ─── SCORE ────────────────────────────────────────────────────────────────────
//

/// Score `questions` in order against the recorded answers.
///
/// An empty question list scores 0% and does not pass.
#[must_use]
pub fn score(ledger: &AnswerLedger, questions: &[Question]) -> ScoreResult {
    let mut correct_answers = Vec::new();
    let mut wrong_answers = Vec::new();
    let mut wrong_count = 0;
    let mut skipped_count = 0;

    for (index, question) in questions.iter().enumerate() {
        let number = index + 1;
        match ledger.get(question.id) {
            Some(answer) if answer == question.correct_answer => {
                correct_answers.push(CorrectAnswer {
                    number,
                    question_id: question.id,
                    question: question.question.clone(),
                    answer,
                });
            }
            answer => {
                if answer.is_some() {
                    wrong_count += 1;
                } else {
                    skipped_count += 1;
                }
                wrong_answers.push(WrongAnswer {
                    number,
                    question_id: question.id,
                    question: question.question.clone(),
                    user_answer: answer,
                    correct_answer: question.correct_answer,
                    options: question.options.clone(),
                    skipped: answer.is_none(),
                });
            }
        }
    }

    let total_questions = questions.len();
    let percentage = round2(percent(correct_answers.len(), total_questions));
    let passed = total_questions > 0 && percentage >= PASS_THRESHOLD;

    ScoreResult {
        correct_count: correct_answers.len(),
        wrong_count,
        skipped_count,
        total_questions,
        percentage,
        grade: Grade::from_percentage(percentage),
        passed,
        wrong_answers,
        correct_answers,
    }
}

//
// ─── WRONG-ANSWER ANALYSIS ────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongAnswerAnalysis {
    pub total: usize,
    pub by_option: BTreeMap<OptionKey, usize>,
    pub skipped: usize,
    /// First key in A..D order with the highest count; `None` if every entry was skipped.
    pub most_frequent: Option<OptionKey>,
}

#[must_use]
pub fn analyze_wrong_answers(wrong_answers: &[WrongAnswer]) -> WrongAnswerAnalysis {
    let mut by_option: BTreeMap<OptionKey, usize> =
        OptionKey::ALL.iter().map(|key| (*key, 0)).collect();
    let mut skipped = 0;

    for item in wrong_answers {
        match item.user_answer {
            Some(key) if !item.skipped => *by_option.entry(key).or_default() += 1,
            _ => skipped += 1,
        }
    }

    let max = by_option.values().copied().max().unwrap_or(0);
    let most_frequent = if max == 0 {
        None
    } else {
        OptionKey::ALL
            .iter()
            .copied()
            .find(|key| by_option.get(key) == Some(&max))
    };

    WrongAnswerAnalysis {
        total: wrong_answers.len(),
        by_option,
        skipped,
        most_frequent,
    }
}

//
// ─── PREDICTION ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    #[must_use]
    pub fn from_answered(answered: usize) -> Self {
        if answered >= 10 {
            Confidence::High
        } else if answered >= 5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePrediction {
    pub predicted: f64,
    pub confidence: Confidence,
    pub message: String,
}

/// Extrapolate a final percentage from the questions answered so far.
#[must_use]
pub fn predict_score(ledger: &AnswerLedger, questions: &[Question]) -> ScorePrediction {
    let (answered, correct) = questions
        .iter()
        .filter_map(|q| ledger.get(q.id).map(|answer| answer == q.correct_answer))
        .fold((0_usize, 0_usize), |(answered, correct), is_correct| {
            (answered + 1, correct + usize::from(is_correct))
        });

    if answered == 0 {
        return ScorePrediction {
            predicted: 0.0,
            confidence: Confidence::Low,
            message: "No answers yet, nothing to predict from".to_owned(),
        };
    }

    ScorePrediction {
        predicted: round2(percent(correct, answered)),
        confidence: Confidence::from_answered(answered),
        message: format!("Based on {answered} answered questions"),
    }
}

//
// ─── REPORTS & COMPARISONS ────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub total_questions: usize,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub skipped_count: usize,
    pub percentage: f64,
    pub grade: Grade,
    pub passed: bool,
    pub correct_rate: u32,
    pub wrong_rate: u32,
    pub skip_rate: u32,
    pub analysis: WrongAnswerAnalysis,
    pub recommendation: String,
}

#[must_use]
pub fn generate_report(result: &ScoreResult) -> ScoreReport {
    let total = result.total_questions;
    ScoreReport {
        total_questions: total,
        correct_count: result.correct_count,
        wrong_count: result.wrong_count,
        skipped_count: result.skipped_count,
        percentage: result.percentage,
        grade: result.grade,
        passed: result.passed,
        correct_rate: whole_percent(result.correct_count, total),
        wrong_rate: whole_percent(result.wrong_count, total),
        skip_rate: whole_percent(result.skipped_count, total),
        analysis: analyze_wrong_answers(&result.wrong_answers),
        recommendation: result.grade.recommendation().to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultComparison {
    pub score_difference: f64,
    pub correct_difference: i64,
    pub improved: bool,
    /// Relative change in percent; `None` when the earlier score was 0.
    pub improvement_percentage: Option<f64>,
}

#[must_use]
pub fn compare_results(previous: &ScoreResult, latest: &ScoreResult) -> ResultComparison {
    let score_difference = round2(latest.percentage - previous.percentage);
    let to_i64 = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    let improvement_percentage = if previous.percentage > 0.0 {
        Some(round2(score_difference / previous.percentage * 100.0))
    } else {
        None
    };

    ResultComparison {
        score_difference,
        correct_difference: to_i64(latest.correct_count) - to_i64(previous.correct_count),
        improved: latest.percentage > previous.percentage,
        improvement_percentage,
    }
}

/// Mean percentage across results, 0 for an empty slice.
#[must_use]
pub fn average_percentage(results: &[ScoreResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let sum: f64 = results.iter().map(|r| r.percentage).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum / results.len() as f64;
    round2(mean)
}

#[must_use]
pub fn best_percentage(results: &[ScoreResult]) -> f64 {
    results
        .iter()
        .map(|r| r.percentage)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

#[must_use]
pub fn worst_percentage(results: &[ScoreResult]) -> f64 {
    results
        .iter()
        .map(|r| r.percentage)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

/// Average whole seconds spent per question.
#[must_use]
pub fn average_time_per_question(total_seconds: u64, question_count: usize) -> u64 {
    if question_count == 0 {
        return 0;
    }
    let count = u64::try_from(question_count).unwrap_or(u64::MAX);
    (total_seconds + count / 2) / count
}

/// One-line summary such as `"35/70 correct (50%) - Average"`.
#[must_use]
pub fn format_result(result: &ScoreResult) -> String {
    format!(
        "{}/{} correct ({}%) - {}",
        result.correct_count, result.total_questions, result.percentage, result.grade
    )
}
