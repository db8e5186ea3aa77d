use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Reasons a question bank document is rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("question bank contains no questions")]
    Empty,

    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),

    #[error("question {id} is missing option {key}")]
    MissingOption { id: QuestionId, key: OptionKey },

    #[error("question {0} has empty text")]
    EmptyText(QuestionId),
}

/// Error returned when a string is not one of `A`..`D`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid option key: {0:?}")]
pub struct InvalidOptionKey(pub String);

//
// ─── OPTION KEY ───────────────────────────────────────────────────────────────
//

/// One of the four answer slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    /// All keys in display order.
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        }
    }

    /// Zero-based slot index (A = 0).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            OptionKey::A => 0,
            OptionKey::B => 1,
            OptionKey::C => 2,
            OptionKey::D => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = InvalidOptionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(OptionKey::A),
            "B" | "b" => Ok(OptionKey::B),
            "C" | "c" => Ok(OptionKey::C),
            "D" | "d" => Ok(OptionKey::D),
            other => Err(InvalidOptionKey(other.to_owned())),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question as stored in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub question: String,
    pub options: BTreeMap<OptionKey, String>,
    pub correct_answer: OptionKey,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// Text of the given option, if present.
    #[must_use]
    pub fn option_text(&self, key: OptionKey) -> Option<&str> {
        self.options.get(&key).map(String::as_str)
    }

    /// Text of the correct option.
    #[must_use]
    pub fn correct_text(&self) -> Option<&str> {
        self.option_text(self.correct_answer)
    }

    #[must_use]
    pub fn is_correct(&self, key: OptionKey) -> bool {
        self.correct_answer == key
    }

    fn validate(&self) -> Result<(), BankError> {
        if self.question.trim().is_empty() {
            return Err(BankError::EmptyText(self.id));
        }
        for key in OptionKey::ALL {
            if !self.options.contains_key(&key) {
                return Err(BankError::MissingOption { id: self.id, key });
            }
        }
        Ok(())
    }
}

//
// ─── QUESTION BANK ────────────────────────────────────────────────────────────
//

/// The full set of available questions, as loaded from `{ "questions": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank from already-parsed questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the list is empty, ids repeat, or a question is incomplete.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(BankError::DuplicateId(question.id));
            }
            question.validate()?;
        }
        Ok(Self { questions })
    }

    /// Parse and validate a bank document.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Malformed` for bad JSON and the validation errors of [`QuestionBank::new`].
    pub fn from_json(raw: &str) -> Result<Self, BankError> {
        #[derive(Deserialize)]
        struct Document {
            questions: Vec<Question>,
        }

        let doc: Document = serde_json::from_str(raw)?;
        Self::new(doc.questions)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "questions": [
            {
                "id": 1,
                "question": "2 + 2 = ?",
                "options": { "A": "3", "B": "4", "C": "5", "D": "22" },
                "correctAnswer": "B"
            },
            {
                "id": 2,
                "question": "Capital of France?",
                "options": { "A": "Paris", "B": "Rome", "C": "Berlin", "D": "Madrid" },
                "correctAnswer": "A"
            }
        ]
    }"#;

    #[test]
    fn parses_bank_document() {
        let bank = QuestionBank::from_json(SAMPLE).unwrap();
        assert_eq!(bank.len(), 2);
        let first = &bank.questions()[0];
        assert_eq!(first.correct_answer, OptionKey::B);
        assert_eq!(first.correct_text(), Some("4"));
        assert!(bank.get(QuestionId::new(2)).is_some());
    }

    #[test]
    fn rejects_empty_bank() {
        let err = QuestionBank::from_json(r#"{ "questions": [] }"#).unwrap_err();
        assert!(matches!(err, BankError::Empty));
    }

    #[test]
    fn rejects_malformed_document() {
        let err = QuestionBank::from_json(r#"{ "items": [] }"#).unwrap_err();
        assert!(matches!(err, BankError::Malformed(_)));
    }

    #[test]
    fn rejects_unknown_option_key() {
        let raw = r#"{ "questions": [ { "id": 1, "question": "?", "options": { "A": "x", "B": "y", "C": "z", "E": "w" }, "correctAnswer": "A" } ] }"#;
        assert!(matches!(
            QuestionBank::from_json(raw).unwrap_err(),
            BankError::Malformed(_)
        ));
    }

    #[test]
    fn rejects_missing_option() {
        let mut q = fixtures::question(1, OptionKey::A);
        q.options.remove(&OptionKey::C);
        let err = QuestionBank::new(vec![q]).unwrap_err();
        assert!(matches!(
            err,
            BankError::MissingOption {
                key: OptionKey::C,
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = QuestionBank::new(vec![
            fixtures::question(1, OptionKey::A),
            fixtures::question(1, OptionKey::B),
        ])
        .unwrap_err();
        assert!(matches!(err, BankError::DuplicateId(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn option_key_parses_and_displays() {
        assert_eq!("c".parse::<OptionKey>().unwrap(), OptionKey::C);
        assert!("E".parse::<OptionKey>().is_err());
        assert_eq!(OptionKey::D.to_string(), "D");
        assert_eq!(OptionKey::from_index(1), Some(OptionKey::B));
        assert_eq!(OptionKey::from_index(4), None);
    }
}
