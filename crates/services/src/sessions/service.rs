use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use quiz_core::model::{
    AnswerLedger, OptionKey, Question, QuestionBank, QuestionId, ScoreResult, completion_percent,
};
use quiz_core::sampler;
use quiz_core::scoring::{self, ScorePrediction};
use quiz_core::time::elapsed_whole_seconds;
use quiz_core::timer::{self, CountdownTimer, RepeatingTask, TickOutcome, TimerState};
use storage::QuizStore;

use crate::Clock;
use crate::error::SessionError;
use crate::stats_service::StatsService;

use super::mode::{QuestionSource, SessionKind, SessionMode};
use super::progress::SessionProgress;

//
// ─── SESSION OUTPUTS ──────────────────────────────────────────────────────────
//

/// What the host learns after recording an answer.
///
/// Correctness is only revealed in practice; exams keep it hidden until submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected: OptionKey,
    pub previous: Option<OptionKey>,
    pub is_correct: Option<bool>,
    pub correct_answer: Option<OptionKey>,
}

/// Result of one elapsed second.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTick {
    pub time_left: u32,
    /// Remaining time is inside the warning window.
    pub warning: bool,
    /// Set when this tick ran the clock out and submitted the session.
    pub result: Option<ScoreResult>,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// One practice or exam attempt over a fixed list of questions.
pub struct QuizSession {
    mode: SessionMode,
    pool: Vec<Question>,
    questions: Vec<Question>,
    ledger: AnswerLedger,
    current: usize,
    timer: Option<CountdownTimer>,
    store: QuizStore,
    stats: StatsService,
    clock: Clock,
    started_at: DateTime<Utc>,
    resumed: bool,
    focus_losses: u32,
    time_spent: Option<u64>,
    result: Option<ScoreResult>,
}

impl QuizSession {
    /// Open a session over `bank`, resuming persisted state where the mode allows it.
    ///
    /// Practice reloads its saved answers. An exam resumes a saved subset together
    /// with its answers and the countdown (minus the time spent away), or draws and
    /// persists a fresh subset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the bank or the sampled subset has no questions.
    pub fn start(
        mode: SessionMode,
        bank: &QuestionBank,
        store: QuizStore,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        if bank.is_empty() {
            return Err(SessionError::Empty);
        }
        let now = clock.now();
        let stats = StatsService::new(store.clone(), clock);
        let mut session = Self {
            mode,
            pool: bank.questions().to_vec(),
            questions: Vec::new(),
            ledger: AnswerLedger::new(),
            current: 0,
            timer: mode.timer_seconds.map(CountdownTimer::new),
            store,
            stats,
            clock,
            started_at: now,
            resumed: false,
            focus_losses: 0,
            time_spent: None,
            result: None,
        };

        match mode.kind {
            SessionKind::Practice => session.open_practice(),
            SessionKind::Exam => session.open_exam(now),
        }

        if session.questions.is_empty() {
            return Err(SessionError::Empty);
        }
        tracing::info!(
            kind = ?mode.kind,
            questions = session.questions.len(),
            answered = session.answered_count(),
            resumed = session.resumed,
            "session started"
        );
        Ok(session)
    }

    fn open_practice(&mut self) {
        self.questions = self.select();
        self.ledger = self.store.load_practice_progress();
        self.resumed = !self.ledger.is_empty();
    }

    fn open_exam(&mut self, now: DateTime<Utc>) {
        let Some(saved) = self.store.load_exam_questions() else {
            self.begin_exam_attempt(now);
            return;
        };
        self.questions = saved;
        self.ledger = self.store.load_exam_answers();
        self.started_at = self.store.load_exam_start_time().unwrap_or(now);
        self.resumed = true;

        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        let left = match self.store.load_exam_time_left(now) {
            Some(snapshot) => snapshot.time_left,
            None => {
                let elapsed = elapsed_whole_seconds(self.started_at.timestamp_millis(), now);
                tracing::warn!(elapsed, "no saved countdown, deriving it from the start time");
                timer
                    .initial()
                    .saturating_sub(u32::try_from(elapsed).unwrap_or(u32::MAX))
            }
        };
        timer.set_time_left(left);
        if left == 0 {
            tracing::info!("exam time ran out while the session was closed");
        }
    }

    /// Draw a fresh subset and persist it as a new attempt.
    fn begin_exam_attempt(&mut self, now: DateTime<Utc>) {
        self.store.clear_exam_data();
        self.questions = self.select();
        self.started_at = now;
        self.store.save_exam_questions(&self.questions);
        self.store.save_exam_start_time(now);
        self.persist_timer();
    }

    fn select(&self) -> Vec<Question> {
        match self.mode.question_source {
            QuestionSource::FullBank => self.pool.clone(),
            QuestionSource::Sampled { count } => sampler::sample(&self.pool, count),
        }
    }

    //
    // ─── ACCESSORS ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether persisted state was picked up when the session opened.
    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&ScoreResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn time_left(&self) -> Option<u32> {
        self.timer.as_ref().map(CountdownTimer::time_left)
    }

    #[must_use]
    pub fn timer_state(&self) -> Option<TimerState> {
        self.timer.as_ref().map(CountdownTimer::state)
    }

    /// Remaining time as `MM:SS`, for timed sessions.
    #[must_use]
    pub fn time_display(&self) -> Option<String> {
        self.time_left()
            .map(|left| timer::format_clock(i64::from(left)))
    }

    #[must_use]
    pub fn focus_losses(&self) -> u32 {
        self.focus_losses
    }

    /// Seconds spent on the attempt, frozen at submit.
    ///
    /// Timed sessions count the countdown used; untimed ones the wall-clock
    /// time since the session started.
    #[must_use]
    pub fn time_spent(&self) -> u64 {
        if let Some(spent) = self.time_spent {
            return spent;
        }
        match &self.timer {
            Some(timer) => u64::from(timer.initial().saturating_sub(timer.time_left())),
            None => elapsed_whole_seconds(self.started_at.timestamp_millis(), self.clock.now()),
        }
    }

    #[must_use]
    pub fn average_time_per_question(&self) -> u64 {
        scoring::average_time_per_question(self.time_spent(), self.questions.len())
    }

    fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.ledger.is_answered(q.id))
            .count()
    }

    //
    // ─── NAVIGATION ───────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn next(&mut self) -> bool {
        self.jump_to(self.current + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.jump_to(index),
            None => false,
        }
    }

    /// Move to `index`; out-of-range targets leave the position unchanged.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.questions.len() {
            return false;
        }
        self.current = index;
        true
    }

    //
    // ─── ANSWERING ────────────────────────────────────────────────────────────
    //

    /// Answer the question at the current position.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::answer_question`].
    pub fn answer(&mut self, key: OptionKey) -> Result<AnswerFeedback, SessionError> {
        let id = self
            .current_question()
            .map(|q| q.id)
            .ok_or(SessionError::Empty)?;
        self.answer_question(id, key)
    }

    /// Record `key` for question `id` and persist the ledger.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after submit, `UnknownQuestion` for ids
    /// outside the session and `AnswerLocked` when the mode forbids changing an answer.
    pub fn answer_question(
        &mut self,
        id: QuestionId,
        key: OptionKey,
    ) -> Result<AnswerFeedback, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let Some(question) = self.questions.iter().find(|q| q.id == id) else {
            return Err(SessionError::UnknownQuestion(id));
        };
        if !self.mode.allow_reanswer && self.ledger.is_answered(id) {
            return Err(SessionError::AnswerLocked(id));
        }

        let (is_correct, correct_answer) = match self.mode.kind {
            SessionKind::Practice => (Some(question.is_correct(key)), Some(question.correct_answer)),
            SessionKind::Exam => (None, None),
        };
        let previous = self.ledger.record(id, key);
        self.persist_ledger();
        tracing::debug!(question = %id, answer = %key, "answer recorded");

        Ok(AnswerFeedback {
            question_id: id,
            selected: key,
            previous,
            is_correct,
            correct_answer,
        })
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            completion_rate: completion_percent(answered, total),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn prediction(&self) -> ScorePrediction {
        scoring::predict_score(&self.ledger, &self.questions)
    }

    /// Count the host losing focus (tab switch) while a timed attempt is live.
    pub fn record_focus_loss(&mut self) -> u32 {
        let live = self.timer.as_ref().is_some_and(|t| t.time_left() > 0) && !self.is_complete();
        if live {
            self.focus_losses += 1;
            tracing::warn!(count = self.focus_losses, "focus left the session");
        }
        self.focus_losses
    }

    //
    // ─── TIMER ────────────────────────────────────────────────────────────────
    //

    fn timer_mut(&mut self) -> Result<&mut CountdownTimer, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        self.timer.as_mut().ok_or(SessionError::NoTimer)
    }

    /// Start the countdown.
    ///
    /// A resumed exam whose time already ran out is submitted instead, and its
    /// result returned.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoTimer` for untimed modes and `Completed` after submit.
    pub fn start_timer(&mut self) -> Result<Option<ScoreResult>, SessionError> {
        let timer = self.timer_mut()?;
        if timer.time_left() == 0 {
            return self.submit().map(Some);
        }
        timer.start();
        Ok(None)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoTimer` for untimed modes and `Completed` after submit.
    pub fn pause_timer(&mut self) -> Result<(), SessionError> {
        self.timer_mut()?.pause();
        self.persist_timer();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoTimer` for untimed modes and `Completed` after submit.
    pub fn resume_timer(&mut self) -> Result<(), SessionError> {
        self.timer_mut()?.resume();
        Ok(())
    }

    /// Hand the countdown the task that produces its ticks; it is cancelled when
    /// the timer stops.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoTimer` for untimed modes and `Completed` after submit.
    pub fn attach_tick_source(&mut self, source: Box<dyn RepeatingTask>) -> Result<(), SessionError> {
        self.timer_mut()?.attach_tick_source(source);
        Ok(())
    }

    /// Advance the countdown by one second, persist it and submit on expiry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoTimer` for untimed modes and `Completed` after submit.
    pub fn on_second_elapsed(&mut self) -> Result<SessionTick, SessionError> {
        let threshold = self.mode.warning_threshold_secs;
        let outcome = self.timer_mut()?.tick();
        match outcome {
            TickOutcome::Ignored => Ok(SessionTick {
                time_left: self.time_left().unwrap_or(0),
                warning: false,
                result: None,
            }),
            TickOutcome::Ticked(left) => {
                self.persist_timer();
                Ok(SessionTick {
                    time_left: left,
                    warning: timer::should_warn(left, threshold),
                    result: None,
                })
            }
            TickOutcome::Expired => {
                tracing::info!("time is up, submitting");
                let result = self.submit()?;
                Ok(SessionTick {
                    time_left: 0,
                    warning: false,
                    result: Some(result),
                })
            }
        }
    }

    //
    // ─── PERSISTENCE ──────────────────────────────────────────────────────────
    //

    fn persist_ledger(&self) -> bool {
        match self.mode.kind {
            SessionKind::Practice => self.store.save_practice_progress(&self.ledger),
            SessionKind::Exam => self.store.save_exam_answers(&self.ledger),
        }
    }

    fn persist_timer(&self) {
        if self.mode.kind != SessionKind::Exam {
            return;
        }
        if let Some(timer) = &self.timer {
            self.store
                .save_exam_time_left(&timer.snapshot(self.clock.now()));
        }
    }

    /// Re-save the current answers (and countdown). Skipped while nothing is answered.
    pub fn autosave(&self) -> bool {
        if self.is_complete() || self.ledger.is_empty() {
            return false;
        }
        let saved = self.persist_ledger();
        self.persist_timer();
        tracing::debug!(answered = self.ledger.answered_count(), saved, "autosave");
        saved
    }

    //
    // ─── COMPLETION ───────────────────────────────────────────────────────────
    //

    /// Stop the countdown and score the attempt.
    ///
    /// Exams fold the score into the user's stats and clear their saved state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session was already submitted.
    pub fn submit(&mut self) -> Result<ScoreResult, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
        }

        let spent = self.time_spent();
        self.time_spent = Some(spent);
        let result = scoring::score(&self.ledger, &self.questions);
        if self.mode.is_exam() {
            self.stats.record(result.percentage, result.passed);
            self.store.clear_exam_data();
        }
        tracing::info!(
            kind = ?self.mode.kind,
            summary = %scoring::format_result(&result),
            passed = result.passed,
            time_spent = spent,
            "session submitted"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Forget all answers and saved state for this mode and start over at the
    /// first question with a fresh countdown. Exams draw a new subset.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.current = 0;
        self.result = None;
        self.focus_losses = 0;
        self.time_spent = None;
        self.started_at = self.clock.now();
        if let Some(timer) = self.timer.as_mut() {
            timer.reset();
        }
        match self.mode.kind {
            SessionKind::Practice => {
                self.store.clear_practice_progress();
            }
            SessionKind::Exam => self.begin_exam_attempt(self.started_at),
        }
        tracing::info!(kind = ?self.mode.kind, "session reset");
    }

    /// Wait until every write issued so far has reached the backend.
    pub async fn flush(&self) -> bool {
        self.store.flush().await
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("mode", &self.mode)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.ledger.answered_count())
            .field("current", &self.current)
            .field("timer", &self.timer)
            .field("started_at", &self.started_at)
            .field("completed", &self.is_complete())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
