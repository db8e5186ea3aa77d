use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::OptionKey;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("failed to encode answers: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Answers chosen so far, keyed by question.
///
/// A missing entry means the question is unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerLedger {
    answers: BTreeMap<QuestionId, OptionKey>,
}

impl AnswerLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the answer for a question.
    ///
    /// Returns the previous answer, if any.
    pub fn record(&mut self, id: QuestionId, key: OptionKey) -> Option<OptionKey> {
        self.answers.insert(id, key)
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<OptionKey> {
        self.answers.get(&id).copied()
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Percentage of `total_questions` that have an answer, rounded to a whole number.
    #[must_use]
    pub fn completion_rate(&self, total_questions: usize) -> u32 {
        completion_percent(self.answers.len(), total_questions)
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, OptionKey)> + '_ {
        self.answers.iter().map(|(id, key)| (*id, *key))
    }

    /// Encode the ledger as a JSON object of `"id": "key"` pairs.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Encode` if serialization fails.
    pub fn to_blob(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a ledger from a stored blob.
    ///
    /// Missing or unreadable blobs yield an empty ledger.
    #[must_use]
    pub fn restore(blob: Option<&str>) -> Self {
        let Some(raw) = blob else {
            return Self::default();
        };
        match serde_json::from_str(raw) {
            Ok(ledger) => ledger,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable answer ledger");
                Self::default()
            }
        }
    }
}

/// `answered` as a whole-number percentage of `total`; zero when `total` is zero.
#[must_use]
pub fn completion_percent(answered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = 100.0 * answered as f64 / total as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = rate.round() as u32;
    rounded
}

impl FromIterator<(QuestionId, OptionKey)> for AnswerLedger {
    fn from_iter<I: IntoIterator<Item = (QuestionId, OptionKey)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> QuestionId {
        QuestionId::new(n)
    }

    #[test]
    fn record_overwrites_previous_answer() {
        let mut ledger = AnswerLedger::new();
        assert_eq!(ledger.record(id(1), OptionKey::A), None);
        assert_eq!(ledger.record(id(1), OptionKey::C), Some(OptionKey::A));
        assert_eq!(ledger.get(id(1)), Some(OptionKey::C));
        assert_eq!(ledger.answered_count(), 1);
        assert_eq!(ledger.get(id(2)), None);
    }

    #[test]
    fn completion_rate_rounds() {
        let ledger: AnswerLedger = [(id(1), OptionKey::A), (id(2), OptionKey::B)]
            .into_iter()
            .collect();
        assert_eq!(ledger.completion_rate(3), 67);
        assert_eq!(ledger.completion_rate(2), 100);
        assert_eq!(ledger.completion_rate(0), 0);
    }

    #[test]
    fn completion_percent_handles_empty_totals() {
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(0, 0), 0);
    }

    #[test]
    fn clear_empties_ledger() {
        let mut ledger = AnswerLedger::new();
        ledger.record(id(5), OptionKey::D);
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn blob_round_trips() {
        let mut ledger = AnswerLedger::new();
        ledger.record(id(3), OptionKey::B);
        ledger.record(id(12), OptionKey::D);

        let blob = ledger.to_blob().unwrap();
        assert_eq!(blob, r#"{"3":"B","12":"D"}"#);
        assert_eq!(AnswerLedger::restore(Some(&blob)), ledger);
    }

    #[test]
    fn corrupt_or_missing_blob_restores_empty() {
        assert!(AnswerLedger::restore(None).is_empty());
        assert!(AnswerLedger::restore(Some("{not json")).is_empty());
        assert!(AnswerLedger::restore(Some(r#"{"1":""}"#)).is_empty());
    }
}
