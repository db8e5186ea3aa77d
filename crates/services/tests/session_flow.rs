use std::path::PathBuf;

use chrono::Duration;
use quiz_core::Clock;
use quiz_core::model::{OptionKey, QuestionBank};
use quiz_core::time::fixed_now;
use services::{QuizConfig, QuizSession, SessionMode, open_store};
use storage::QuizStore;

fn bank(n: u64) -> QuestionBank {
    let questions: Vec<String> = (1..=n)
        .map(|id| {
            let correct = ["A", "B", "C", "D"][(id % 4) as usize];
            format!(
                r#"{{ "id": {id}, "question": "Q{id}?", "options": {{ "A": "a", "B": "b", "C": "c", "D": "d" }}, "correctAnswer": "{correct}" }}"#
            )
        })
        .collect();
    QuestionBank::from_json(&format!(r#"{{ "questions": [{}] }}"#, questions.join(","))).unwrap()
}

async fn sqlite_store(dir: &PathBuf) -> QuizStore {
    let config = QuizConfig {
        data_dir: Some(dir.clone()),
        ..QuizConfig::default()
    };
    open_store(&config).await.unwrap()
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("quiz-session-it-{}", uuid::Uuid::new_v4()))
}

fn exam_mode() -> SessionMode {
    SessionMode::exam(&QuizConfig {
        exam_question_count: 10,
        exam_duration_secs: 3600,
        ..QuizConfig::default()
    })
}

#[tokio::test]
async fn exam_resumes_subset_answers_and_remaining_time() {
    let dir = temp_dir();
    let bank = bank(40);
    let start = fixed_now();

    let (subset, answered) = {
        let mut session =
            QuizSession::start(exam_mode(), &bank, sqlite_store(&dir).await, Clock::fixed(start)).unwrap();
        session.answer(OptionKey::A).unwrap();
        session.next();
        session.answer(OptionKey::B).unwrap();
        assert!(session.flush().await);
        (session.questions().to_vec(), session.ledger().clone())
    };

    let later = Clock::fixed(start + Duration::seconds(600));
    let mut resumed = QuizSession::start(exam_mode(), &bank, sqlite_store(&dir).await, later).unwrap();
    assert!(resumed.is_resumed());
    assert_eq!(resumed.questions(), subset.as_slice());
    assert_eq!(resumed.ledger(), &answered);
    assert_eq!(resumed.started_at(), start);
    assert_eq!(resumed.time_left(), Some(3000));
    assert_eq!(resumed.progress().answered, 2);

    let result = resumed.submit().unwrap();
    assert_eq!(result.total_questions, 10);
    assert_eq!(result.answered_count(), 2);
    assert_eq!(resumed.time_spent(), 600);
    assert!(resumed.flush().await);

    let fresh = sqlite_store(&dir).await;
    assert!(fresh.load_exam_questions().is_none());
    assert_eq!(fresh.load_user_stats().total_exams, 1);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn exam_that_ran_out_while_closed_submits_on_start() {
    let dir = temp_dir();
    let bank = bank(20);
    let start = fixed_now();

    {
        let mut session =
            QuizSession::start(exam_mode(), &bank, sqlite_store(&dir).await, Clock::fixed(start)).unwrap();
        session.answer(OptionKey::C).unwrap();
        assert!(session.flush().await);
    }

    let later = Clock::fixed(start + Duration::seconds(4000));
    let mut resumed = QuizSession::start(exam_mode(), &bank, sqlite_store(&dir).await, later).unwrap();
    assert_eq!(resumed.time_left(), Some(0));

    let result = resumed.start_timer().unwrap().expect("expired exam is submitted");
    assert_eq!(result.answered_count(), 1);
    assert!(resumed.is_complete());
    assert!(resumed.flush().await);
    assert_eq!(sqlite_store(&dir).await.load_user_stats().exam_history.len(), 1);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn practice_progress_is_independent_of_exam_state() {
    let dir = temp_dir();
    let bank = bank(8);
    let clock = Clock::fixed(fixed_now());

    let mut exam = QuizSession::start(exam_mode(), &bank, sqlite_store(&dir).await, clock).unwrap();
    exam.answer(OptionKey::D).unwrap();

    let mut practice =
        QuizSession::start(SessionMode::practice(), &bank, sqlite_store(&dir).await, clock).unwrap();
    assert!(!practice.is_resumed());
    assert_eq!(practice.questions().len(), 8);
    practice.answer(OptionKey::B).unwrap();
    practice.reset();
    assert!(exam.flush().await);
    assert!(practice.flush().await);

    let store = sqlite_store(&dir).await;
    assert!(store.load_practice_progress().is_empty());
    assert_eq!(store.load_exam_answers().answered_count(), 1);

    std::fs::remove_dir_all(dir).unwrap();
}
