//! Countdown engine.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller (or [`crate::driver::drive`]) is
//! responsible for calling `tick()` periodically.
//!
//! Remaining time is recomputed from absolute timestamps on every tick
//! rather than decremented, so a scheduler that fires late or skips
//! firings still sees the true remaining time on the next tick.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!       Completed -> Running (start)
//!
//! any -> Idle (reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(SystemClock, 25 * 60).with_store(store);
//! engine.restore();
//! engine.start(25 * 60)?;
//! // In a loop:
//! engine.tick(); // Returns Some(Event::TimerCompleted) once, at zero
//! ```

use super::state::{TimerState, TimerStatus};
use crate::clock::{Clock, SystemClock};
use crate::error::TimerError;
use crate::events::Event;
use crate::storage::TimerStore;

/// Observation callbacks supplied at construction.
pub trait TimerListener {
    /// Called on every tick of a Running countdown with the recomputed
    /// remaining time.
    fn on_tick(&mut self, _remaining_ms: u64) {}

    /// Called exactly once when a countdown reaches zero, after its last
    /// tick.
    fn on_complete(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl TimerListener for NoopListener {}

/// One countdown, its persistence key and its callbacks.
pub struct TimerEngine<C: Clock = SystemClock> {
    clock: C,
    state: TimerState,
    /// Duration an Idle engine presents; updated by `start()`.
    default_duration_ms: u64,
    store: Option<TimerStore>,
    listener: Box<dyn TimerListener>,
}

impl<C: Clock> std::fmt::Debug for TimerEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("clock", &self.clock)
            .field("state", &self.state)
            .field("default_duration_ms", &self.default_duration_ms)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> TimerEngine<C> {
    pub fn new(clock: C, default_duration_secs: u64) -> Self {
        let default_duration_ms = default_duration_secs.saturating_mul(1000);
        Self {
            clock,
            state: TimerState::idle(default_duration_ms),
            default_duration_ms,
            store: None,
            listener: Box::new(NoopListener),
        }
    }

    pub fn with_store(mut self, store: TimerStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_listener<L: TimerListener + 'static>(mut self, listener: L) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn set_listener(&mut self, listener: Box<dyn TimerListener>) {
        self.listener = listener;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn remaining_ms(&self) -> u64 {
        self.state.remaining_ms_at(self.clock.now_ms())
    }

    pub fn total_ms(&self) -> u64 {
        self.state.total_duration_ms
    }

    /// 0.0 .. 1.0 progress through the current countdown.
    pub fn progress(&self) -> f64 {
        self.state.progress_at(self.clock.now_ms())
    }

    pub fn is_ticking(&self) -> bool {
        self.state.status == TimerStatus::Running
    }

    pub fn default_duration_ms(&self) -> u64 {
        self.default_duration_ms
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let now = self.clock.now_ms();
        Event::StateSnapshot {
            status: self.state.status,
            remaining_ms: self.state.remaining_ms_at(now),
            total_ms: self.state.total_duration_ms,
            progress: self.state.progress_at(now),
            phase: None,
            completed_work_sessions: None,
            at: self.clock.now_utc(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh countdown of `duration_secs`.
    ///
    /// Only valid from `Idle` or `Completed`; restarting an in-flight
    /// countdown would silently drop its elapsed time.
    pub fn start(&mut self, duration_secs: u64) -> Result<Event, TimerError> {
        match self.state.status {
            TimerStatus::Running => Err(TimerError::AlreadyRunning),
            TimerStatus::Paused => Err(TimerError::InvalidTransition {
                op: "start",
                status: TimerStatus::Paused,
            }),
            TimerStatus::Idle | TimerStatus::Completed => {
                let total = duration_secs.saturating_mul(1000);
                self.default_duration_ms = total;
                self.state = TimerState {
                    status: TimerStatus::Running,
                    total_duration_ms: total,
                    start_timestamp: self.clock.now_ms(),
                    elapsed_at_pause_ms: 0,
                };
                tracing::debug!(duration_ms = total, "timer started");
                self.persist();
                Ok(Event::TimerStarted {
                    duration_ms: total,
                    at: self.clock.now_utc(),
                })
            }
        }
    }

    /// Bank the elapsed time and stop ticking. No-op unless Running.
    ///
    /// A countdown that has already run out completes instead of pausing.
    pub fn pause(&mut self) -> Option<Event> {
        if self.state.status != TimerStatus::Running {
            return None;
        }
        let now = self.clock.now_ms();
        if self.state.remaining_ms_at(now) == 0 {
            return Some(self.complete());
        }
        let run_ms = now.saturating_sub(self.state.start_timestamp);
        self.state.elapsed_at_pause_ms = self
            .state
            .elapsed_at_pause_ms
            .saturating_add(run_ms)
            .min(self.state.total_duration_ms);
        self.state.status = TimerStatus::Paused;
        let remaining_ms = self.state.remaining_ms_at(now);
        tracing::debug!(remaining_ms, "timer paused");
        self.persist();
        Some(Event::TimerPaused {
            remaining_ms,
            at: self.clock.now_utc(),
        })
    }

    /// Start a new Running period from now. No-op unless Paused.
    pub fn resume(&mut self) -> Option<Event> {
        if self.state.status != TimerStatus::Paused {
            return None;
        }
        self.state.start_timestamp = self.clock.now_ms();
        self.state.status = TimerStatus::Running;
        let remaining_ms = self.state.remaining_ms_at(self.state.start_timestamp);
        tracing::debug!(remaining_ms, "timer resumed");
        self.persist();
        Some(Event::TimerResumed {
            remaining_ms,
            at: self.clock.now_utc(),
        })
    }

    /// Back to Idle from any status, forgetting the persisted snapshot.
    pub fn reset(&mut self) -> Event {
        self.state = TimerState::idle(self.default_duration_ms);
        tracing::debug!("timer reset");
        self.persist();
        Event::TimerReset {
            at: self.clock.now_utc(),
        }
    }

    /// Set the duration an Idle engine presents and `reset()` falls back to.
    /// An in-flight countdown keeps its own duration.
    pub fn set_default_duration(&mut self, duration_secs: u64) {
        self.default_duration_ms = duration_secs.saturating_mul(1000);
        if self.state.status == TimerStatus::Idle {
            self.state = TimerState::idle(self.default_duration_ms);
        }
    }

    /// Discard any countdown and present an Idle one of `duration_secs`,
    /// ready for `start()`.
    pub fn arm(&mut self, duration_secs: u64) -> Event {
        self.default_duration_ms = duration_secs.saturating_mul(1000);
        self.reset()
    }

    /// The current snapshot, verbatim.
    pub fn save_state(&self) -> TimerState {
        self.state
    }

    /// Adopt a snapshot.
    ///
    /// A snapshot that fails validation is discarded whole and the engine
    /// resets to Idle with its default duration. A Running snapshot whose
    /// start lies in the future (the clock moved backward) is rebased to
    /// now. A Running snapshot resumes ticking immediately against the
    /// current wall clock.
    pub fn load_state(&mut self, state: TimerState) -> Event {
        if let Err(err) = state.validate() {
            tracing::warn!(error = %err, "discarding invalid timer snapshot");
            return self.reset();
        }

        let mut state = state;
        let now = self.clock.now_ms();
        let skewed = state.status == TimerStatus::Running && now < state.start_timestamp;
        if skewed {
            tracing::warn!(
                start_timestamp = state.start_timestamp,
                now,
                "clock is behind snapshot start; rebasing running period"
            );
            state.start_timestamp = now;
        }

        self.state = state;
        self.default_duration_ms = state.total_duration_ms;
        if skewed {
            self.persist();
        }
        let remaining_ms = self.state.remaining_ms_at(now);
        tracing::debug!(status = ?state.status, remaining_ms, "timer snapshot restored");
        Event::StateRestored {
            status: state.status,
            remaining_ms,
            at: self.clock.now_utc(),
        }
    }

    /// Read the persisted snapshot once, at startup.
    ///
    /// Returns `None` when there is no store or nothing was persisted.
    pub fn restore(&mut self) -> Option<Event> {
        let loaded = self.store.as_ref()?.load_state();
        match loaded {
            Ok(Some(state)) => Some(self.load_state(state)),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable timer snapshot");
                Some(self.reset())
            }
        }
    }

    /// Write the current snapshot; call on teardown.
    pub fn flush(&self) {
        self.persist();
    }

    /// Recompute remaining time, report it, and complete at zero.
    ///
    /// Returns `Some(Event::TimerCompleted)` exactly once per countdown.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state.status != TimerStatus::Running {
            return None;
        }
        let remaining_ms = self.remaining_ms();
        self.listener.on_tick(remaining_ms);
        if remaining_ms == 0 {
            return Some(self.complete());
        }
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self) -> Event {
        self.state.elapsed_at_pause_ms = self.state.total_duration_ms;
        self.state.status = TimerStatus::Completed;
        tracing::debug!(total_ms = self.state.total_duration_ms, "timer completed");
        self.persist();
        self.listener.on_complete();
        Event::TimerCompleted {
            total_ms: self.state.total_duration_ms,
            at: self.clock.now_utc(),
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if self.state.status == TimerStatus::Idle {
            store.clear();
        } else {
            store.save_state(&self.state);
        }
    }
}
