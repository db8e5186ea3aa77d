//! Countdown timer for timed exams.
//!
//! The timer does not own a clock thread. A host drives it by calling
//! [`CountdownTimer::tick`] once per elapsed second, usually from a repeating
//! task attached with [`CountdownTimer::attach_tick_source`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::time::elapsed_whole_seconds;

/// Default "time is running out" threshold, in seconds.
pub const DEFAULT_WARNING_SECONDS: u32 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
    #[error("invalid clock format {0:?}, expected MM:SS")]
    InvalidFormat(String),
}

//
// ─── TICK SOURCE ──────────────────────────────────────────────────────────────
//

/// Handle to a scheduled repeating task that produces ticks.
///
/// `cancel` must be idempotent.
pub trait RepeatingTask: Send {
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// What a call to [`CountdownTimer::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer was not running; nothing changed.
    Ignored,
    /// One second elapsed; carries the remaining seconds.
    Ticked(u32),
    /// The countdown reached zero on this tick.
    Expired,
}

/// Persisted `{ timeLeft, timestamp }` pair used to resume after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_left: u32,
    /// Milliseconds since the Unix epoch when the snapshot was taken.
    pub timestamp: i64,
}

impl TimerSnapshot {
    #[must_use]
    pub fn new(time_left: u32, taken_at: DateTime<Utc>) -> Self {
        Self {
            time_left,
            timestamp: taken_at.timestamp_millis(),
        }
    }

    /// Remaining seconds after subtracting the wall-clock time since the snapshot.
    #[must_use]
    pub fn adjusted_time_left(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = elapsed_whole_seconds(self.timestamp, now);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.time_left.saturating_sub(elapsed)
    }

    /// Snapshot with the elapsed time already applied.
    #[must_use]
    pub fn caught_up(&self, now: DateTime<Utc>) -> Self {
        Self {
            time_left: self.adjusted_time_left(now),
            timestamp: self.timestamp,
        }
    }
}

type TickCallback = Box<dyn FnMut(u32) + Send>;
type CompleteCallback = Box<dyn FnMut() + Send>;

//
// ─── COUNTDOWN TIMER ──────────────────────────────────────────────────────────
//

pub struct CountdownTimer {
    initial: u32,
    time_left: u32,
    state: TimerState,
    on_tick: Option<TickCallback>,
    on_complete: Option<CompleteCallback>,
    source: Option<Box<dyn RepeatingTask>>,
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("initial", &self.initial)
            .field("time_left", &self.time_left)
            .field("state", &self.state)
            .field("has_source", &self.source.is_some())
            .finish_non_exhaustive()
    }
}

impl CountdownTimer {
    #[must_use]
    pub fn new(initial_seconds: u32) -> Self {
        Self {
            initial: initial_seconds,
            time_left: initial_seconds,
            state: TimerState::Idle,
            on_tick: None,
            on_complete: None,
            source: None,
        }
    }

    /// Build a timer whose remaining time comes from a saved snapshot.
    #[must_use]
    pub fn restored(initial_seconds: u32, snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Self {
        let mut timer = Self::new(initial_seconds);
        timer.time_left = snapshot.adjusted_time_left(now);
        timer
    }

    #[must_use]
    pub fn on_tick(mut self, callback: impl FnMut(u32) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_complete(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Install the repeating task that drives [`tick`](Self::tick). Any previous
    /// source is cancelled.
    pub fn attach_tick_source(&mut self, source: Box<dyn RepeatingTask>) {
        self.cancel_source();
        self.source = Some(source);
    }

    #[must_use]
    pub fn initial(&self) -> u32 {
        self.initial
    }

    #[must_use]
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Running and not paused.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Started and not yet stopped (running or paused).
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Paused)
    }

    /// Stopped because the countdown ran out.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.state == TimerState::Stopped && self.time_left == 0
    }

    pub fn start(&mut self) {
        if self.is_started() {
            tracing::warn!(state = ?self.state, "timer is already running");
            return;
        }
        if self.time_left == 0 {
            tracing::warn!("refusing to start a timer with no time left");
            return;
        }
        self.state = TimerState::Running;
    }

    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            tracing::warn!(state = ?self.state, "pause ignored, timer is not running");
            return;
        }
        self.state = TimerState::Paused;
    }

    pub fn resume(&mut self) {
        if self.state != TimerState::Paused {
            tracing::warn!(state = ?self.state, "resume ignored, timer is not paused");
            return;
        }
        self.state = TimerState::Running;
    }

    /// Stop the countdown and cancel the tick source. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.cancel_source();
        self.state = TimerState::Stopped;
    }

    /// Back to idle with the initial time; reports the restored value to `on_tick`.
    pub fn reset(&mut self) {
        self.cancel_source();
        self.state = TimerState::Idle;
        self.time_left = self.initial;
        self.emit_tick();
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }
        self.time_left = self.time_left.saturating_sub(1);
        self.emit_tick();
        if self.time_left == 0 {
            self.expire();
            return TickOutcome::Expired;
        }
        TickOutcome::Ticked(self.time_left)
    }

    pub fn add_time(&mut self, seconds: u32) {
        self.time_left = self.time_left.saturating_add(seconds);
        self.emit_tick();
    }

    /// Remove time, clamping at zero. Hitting zero while started expires the timer.
    ///
    /// Returns `true` if this call expired the timer.
    pub fn subtract_time(&mut self, seconds: u32) -> bool {
        self.time_left = self.time_left.saturating_sub(seconds);
        self.emit_tick();
        if self.time_left == 0 && self.is_started() {
            self.expire();
            return true;
        }
        false
    }

    pub fn set_time_left(&mut self, seconds: u32) {
        self.time_left = seconds;
        self.emit_tick();
    }

    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        TimerSnapshot::new(self.time_left, now)
    }

    fn expire(&mut self) {
        self.stop();
        tracing::info!("countdown expired");
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    fn emit_tick(&mut self) {
        let left = self.time_left;
        if let Some(callback) = self.on_tick.as_mut() {
            callback(left);
        }
    }

    fn cancel_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.cancel();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel_source();
    }
}

//
// ─── FORMATTING ───────────────────────────────────────────────────────────────
//

/// `MM:SS`, zero-padded. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `HH:MM:SS`, zero-padded.
#[must_use]
pub fn format_clock_long(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parse `MM:SS` into seconds.
///
/// # Errors
///
/// Returns `TimerError::InvalidFormat` when the input is not two numeric fields.
pub fn parse_clock(raw: &str) -> Result<u32, TimerError> {
    let invalid = || TimerError::InvalidFormat(raw.to_owned());
    let (minutes, seconds) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.parse().map_err(|_| invalid())?;
    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(invalid)
}

/// True while time remains but is at or below the warning threshold.
#[must_use]
pub fn should_warn(time_left: u32, threshold: u32) -> bool {
    time_left > 0 && time_left <= threshold
}

/// Remaining time as a percentage of the total, clamped to 0–100.
#[must_use]
pub fn time_percentage(time_left: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * f64::from(time_left) / f64::from(total)).clamp(0.0, 100.0)
}

/// Human-readable remaining time.
#[must_use]
pub fn describe_remaining(seconds: u32) -> String {
    match seconds {
        0 => "Time is up".to_owned(),
        1..=59 => format!("{seconds} seconds left"),
        60..=3599 => format!("{} minutes left", seconds / 60),
        _ => format!(
            "{} hours {} minutes left",
            seconds / 3600,
            (seconds % 3600) / 60
        ),
    }
}
