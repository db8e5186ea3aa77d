//! Async event loop that drives a [`QuizSession`] from host commands,
//! countdown ticks and a periodic autosave.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use quiz_core::model::{OptionKey, QuestionId, ScoreResult};

use crate::config::QuizConfig;
use crate::error::SessionError;
use crate::sessions::{AnswerFeedback, QuizSession, SessionTick};
use crate::ticker::IntervalTicker;

/// Requests a host sends into a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Answer(OptionKey),
    AnswerQuestion(QuestionId, OptionKey),
    Next,
    Previous,
    JumpTo(usize),
    Pause,
    Resume,
    FocusLost,
    Submit,
}

/// Notifications the driver sends back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Answered(AnswerFeedback),
    Moved { index: usize },
    Paused,
    Resumed,
    Tick(SessionTick),
    Rejected(SessionError),
    Submitted(ScoreResult),
}

pub struct SessionDriver {
    session: QuizSession,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    tick_interval: Duration,
    autosave_interval: Duration,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        session: QuizSession,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
        config: &QuizConfig,
    ) -> Self {
        Self {
            session,
            commands,
            events: None,
            tick_interval: config.tick_interval,
            autosave_interval: config.autosave_interval,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> QuizSession {
        self.session
    }

    /// Run until the session is submitted (by command or by the countdown) or
    /// the host drops its command sender.
    ///
    /// Returns the score on submission and `None` when the host hung up; in
    /// that case the answers are saved so the attempt can be resumed. Pending
    /// writes are flushed before returning either way.
    pub async fn run(&mut self) -> Option<ScoreResult> {
        let outcome = self.drive().await;
        if !self.session.flush().await {
            tracing::warn!("session state may not have reached storage");
        }
        outcome
    }

    async fn drive(&mut self) -> Option<ScoreResult> {
        let mut ticks = None;
        if self.session.mode().has_timer() {
            let (ticker, rx) = IntervalTicker::spawn(self.tick_interval);
            if let Err(err) = self.session.attach_tick_source(Box::new(ticker)) {
                self.emit(SessionEvent::Rejected(err));
                return None;
            }
            match self.session.start_timer() {
                Ok(Some(result)) => return Some(self.finish(result)),
                Ok(None) => ticks = Some(rx),
                Err(err) => {
                    self.emit(SessionEvent::Rejected(err));
                    return None;
                }
            }
        }

        let mut autosave = interval_at(
            Instant::now() + self.autosave_interval,
            self.autosave_interval,
        );
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                tick = next_tick(&mut ticks) => {
                    if tick.is_none() {
                        ticks = None;
                        continue;
                    }
                    if let Some(result) = self.handle_tick() {
                        return Some(result);
                    }
                }
                _ = autosave.tick() => {
                    self.session.autosave();
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("host closed the session, saving progress");
                        self.session.autosave();
                        return None;
                    };
                    if let Some(result) = self.apply(command) {
                        return Some(result);
                    }
                }
            }
        }
    }

    fn handle_tick(&mut self) -> Option<ScoreResult> {
        match self.session.on_second_elapsed() {
            Ok(tick) => {
                let result = tick.result.clone();
                self.emit(SessionEvent::Tick(tick));
                result.map(|result| self.finish(result))
            }
            Err(err) => {
                tracing::warn!(error = %err, "tick ignored");
                None
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) -> Option<ScoreResult> {
        tracing::debug!(?command, "session command");
        let outcome = match command {
            SessionCommand::Answer(key) => self.session.answer(key).map(SessionEvent::Answered),
            SessionCommand::AnswerQuestion(id, key) => self
                .session
                .answer_question(id, key)
                .map(SessionEvent::Answered),
            SessionCommand::Next => {
                self.session.next();
                Ok(self.moved())
            }
            SessionCommand::Previous => {
                self.session.previous();
                Ok(self.moved())
            }
            SessionCommand::JumpTo(index) => {
                self.session.jump_to(index);
                Ok(self.moved())
            }
            SessionCommand::Pause => self.session.pause_timer().map(|()| SessionEvent::Paused),
            SessionCommand::Resume => self.session.resume_timer().map(|()| SessionEvent::Resumed),
            SessionCommand::FocusLost => {
                self.session.record_focus_loss();
                return None;
            }
            SessionCommand::Submit => match self.session.submit() {
                Ok(result) => return Some(self.finish(result)),
                Err(err) => Err(err),
            },
        };
        match outcome {
            Ok(event) => self.emit(event),
            Err(err) => self.emit(SessionEvent::Rejected(err)),
        }
        None
    }

    fn moved(&self) -> SessionEvent {
        SessionEvent::Moved {
            index: self.session.current_index(),
        }
    }

    fn finish(&self, result: ScoreResult) -> ScoreResult {
        self.emit(SessionEvent::Submitted(result.clone()));
        result
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // the host may stop listening before the session ends
            let _ = events.send(event);
        }
    }
}

async fn next_tick(ticks: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match ticks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
