/// Keys under which quiz state is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    PracticeProgress,
    ExamAnswers,
    ExamQuestions,
    ExamStartTime,
    ExamTimeLeft,
    UserStats,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::PracticeProgress,
        StorageKey::ExamAnswers,
        StorageKey::ExamQuestions,
        StorageKey::ExamStartTime,
        StorageKey::ExamTimeLeft,
        StorageKey::UserStats,
    ];

    /// Keys cleared when an exam attempt ends.
    pub const EXAM: [StorageKey; 4] = [
        StorageKey::ExamAnswers,
        StorageKey::ExamQuestions,
        StorageKey::ExamStartTime,
        StorageKey::ExamTimeLeft,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::PracticeProgress => "quiz_practice_progress",
            StorageKey::ExamAnswers => "quiz_exam_answers",
            StorageKey::ExamQuestions => "quiz_exam_questions",
            StorageKey::ExamStartTime => "quiz_exam_start_time",
            StorageKey::ExamTimeLeft => "quiz_exam_time_left",
            StorageKey::UserStats => "quiz_user_stats",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
