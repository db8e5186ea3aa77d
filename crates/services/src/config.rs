use std::path::PathBuf;
use std::time::Duration;

use quiz_core::timer::DEFAULT_WARNING_SECONDS;

use crate::error::ConfigError;

pub const DEFAULT_EXAM_QUESTIONS: usize = 70;
pub const DEFAULT_EXAM_SECONDS: u32 = 60 * 60;
pub const DEFAULT_AUTOSAVE_SECONDS: u64 = 30;
pub const DEFAULT_BANK_PATH: &str = "data/questions.json";

/// Where the question bank lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankLocation {
    File(PathBuf),
    Url(String),
}

impl BankLocation {
    /// `http://` and `https://` values are fetched; anything else is a file path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_owned())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for BankLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BankLocation::File(path) => write!(f, "{}", path.display()),
            BankLocation::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub exam_question_count: usize,
    pub exam_duration_secs: u32,
    pub warning_threshold_secs: u32,
    pub autosave_interval: Duration,
    pub tick_interval: Duration,
    pub bank: BankLocation,
    /// Directory holding the SQLite store; `None` keeps state in memory only.
    pub data_dir: Option<PathBuf>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            exam_question_count: DEFAULT_EXAM_QUESTIONS,
            exam_duration_secs: DEFAULT_EXAM_SECONDS,
            warning_threshold_secs: DEFAULT_WARNING_SECONDS,
            autosave_interval: Duration::from_secs(DEFAULT_AUTOSAVE_SECONDS),
            tick_interval: Duration::from_secs(1),
            bank: BankLocation::File(PathBuf::from(DEFAULT_BANK_PATH)),
            data_dir: None,
        }
    }
}

impl QuizConfig {
    /// Read overrides from `QUIZ_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`QuizConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(count) = positive(&lookup, "QUIZ_EXAM_QUESTIONS")? {
            config.exam_question_count = usize::try_from(count).unwrap_or(usize::MAX);
        }
        if let Some(secs) = positive(&lookup, "QUIZ_EXAM_SECONDS")? {
            config.exam_duration_secs = u32::try_from(secs).unwrap_or(u32::MAX);
        }
        if let Some(secs) = positive(&lookup, "QUIZ_WARNING_SECONDS")? {
            config.warning_threshold_secs = u32::try_from(secs).unwrap_or(u32::MAX);
        }
        if let Some(secs) = positive(&lookup, "QUIZ_AUTOSAVE_SECONDS")? {
            config.autosave_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("QUIZ_BANK") {
            if raw.trim().is_empty() {
                return Err(ConfigError::Empty { var: "QUIZ_BANK" });
            }
            config.bank = BankLocation::parse(&raw);
        }
        if let Some(raw) = lookup("QUIZ_DATA_DIR") {
            if raw.trim().is_empty() {
                return Err(ConfigError::Empty {
                    var: "QUIZ_DATA_DIR",
                });
            }
            config.data_dir = Some(PathBuf::from(raw.trim()));
        }

        Ok(config)
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber { var, raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_exam_rules() {
        let config = QuizConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.exam_question_count, 70);
        assert_eq!(config.exam_duration_secs, 3600);
        assert_eq!(config.warning_threshold_secs, 300);
        assert_eq!(config.autosave_interval, Duration::from_secs(30));
        assert_eq!(config, QuizConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = QuizConfig::from_lookup(lookup(&[
            ("QUIZ_EXAM_QUESTIONS", "20"),
            ("QUIZ_EXAM_SECONDS", "900"),
            ("QUIZ_BANK", "https://example.org/questions.json"),
            ("QUIZ_DATA_DIR", "/tmp/quiz"),
        ]))
        .unwrap();
        assert_eq!(config.exam_question_count, 20);
        assert_eq!(config.exam_duration_secs, 900);
        assert_eq!(
            config.bank,
            BankLocation::Url("https://example.org/questions.json".into())
        );
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/quiz")));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = QuizConfig::from_lookup(lookup(&[("QUIZ_EXAM_QUESTIONS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "QUIZ_EXAM_QUESTIONS",
                ..
            }
        ));
        assert!(QuizConfig::from_lookup(lookup(&[("QUIZ_EXAM_SECONDS", "soon")])).is_err());
        assert!(QuizConfig::from_lookup(lookup(&[("QUIZ_BANK", "  ")])).is_err());
    }

    #[test]
    fn bank_location_detects_urls() {
        assert_eq!(
            BankLocation::parse("js/data/questions.json"),
            BankLocation::File(PathBuf::from("js/data/questions.json"))
        );
        assert!(matches!(
            BankLocation::parse("http://localhost/q.json"),
            BankLocation::Url(_)
        ));
    }
}
