use crate::config::QuizConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Practice,
    Exam,
}

/// Where a session takes its questions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    FullBank,
    Sampled { count: usize },
}

/// Capabilities that distinguish practice from exam sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMode {
    pub kind: SessionKind,
    /// Countdown length in seconds; `None` for untimed sessions.
    pub timer_seconds: Option<u32>,
    pub allow_reanswer: bool,
    pub question_source: QuestionSource,
    pub warning_threshold_secs: u32,
}

impl SessionMode {
    /// Untimed, resumable run over the whole bank. Answers lock once given.
    #[must_use]
    pub fn practice() -> Self {
        Self {
            kind: SessionKind::Practice,
            timer_seconds: None,
            allow_reanswer: false,
            question_source: QuestionSource::FullBank,
            warning_threshold_secs: 0,
        }
    }

    /// Timed run over a random subset. Answers may be changed until submit.
    #[must_use]
    pub fn exam(config: &QuizConfig) -> Self {
        Self {
            kind: SessionKind::Exam,
            timer_seconds: Some(config.exam_duration_secs),
            allow_reanswer: true,
            question_source: QuestionSource::Sampled {
                count: config.exam_question_count,
            },
            warning_threshold_secs: config.warning_threshold_secs,
        }
    }

    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.timer_seconds.is_some()
    }

    #[must_use]
    pub fn is_exam(&self) -> bool {
        self.kind == SessionKind::Exam
    }
}
