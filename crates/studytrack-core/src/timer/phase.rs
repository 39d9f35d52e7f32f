//! Work/break cycling on top of a [`TimerEngine`].
//!
//! After `long_break_interval` completed work sessions the next break is a
//! long one; every other work completion is followed by a short break, and
//! every break by work. Whether the next countdown starts on its own is
//! caller policy ([`PhaseOptions`]).

use serde::{Deserialize, Serialize};

use super::engine::{TimerEngine, TimerListener};
use super::state::TimerStatus;
use crate::clock::{Clock, SystemClock};
use crate::error::TimerError;
use crate::events::Event;
use crate::storage::TimerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl PhaseKind {
    pub fn is_break(self) -> bool {
        !matches!(self, PhaseKind::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Work => "Work",
            PhaseKind::ShortBreak => "Short Break",
            PhaseKind::LongBreak => "Long Break",
        }
    }

    /// Stable lowercase name, as used in session records.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::Work => "work",
            PhaseKind::ShortBreak => "short_break",
            PhaseKind::LongBreak => "long_break",
        }
    }
}

/// One occurrence of a phase. A new value is produced on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration_secs: u64,
}

impl Phase {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs as f64 / 60.0
    }
}

/// Per-tool duration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
}

impl PhaseDurations {
    pub fn for_kind(&self, kind: PhaseKind) -> u64 {
        match kind {
            PhaseKind::Work => self.work_secs,
            PhaseKind::ShortBreak => self.short_break_secs,
            PhaseKind::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
        }
    }
}

/// Whether a finished phase starts the next countdown by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseOptions {
    /// A completed work phase starts its break immediately.
    pub auto_start_breaks: bool,
    /// A completed break starts the next work phase immediately.
    pub auto_start_work: bool,
}

impl PhaseOptions {
    fn auto_starts(&self, next: PhaseKind) -> bool {
        if next.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounter {
    pub completed_work_sessions: u32,
    pub long_break_interval: u32,
}

impl SessionCounter {
    /// An interval of 0 is treated as 1.
    pub fn new(long_break_interval: u32) -> Self {
        Self {
            completed_work_sessions: 0,
            long_break_interval: long_break_interval.max(1),
        }
    }

    /// The break that would follow the next recorded work session.
    pub fn next_break(&self) -> PhaseKind {
        if (self.completed_work_sessions.saturating_add(1)) % self.long_break_interval == 0 {
            PhaseKind::LongBreak
        } else {
            PhaseKind::ShortBreak
        }
    }

    /// Count a completed work session and return the break it earns.
    pub fn record_work(&mut self) -> PhaseKind {
        let next = self.next_break();
        self.completed_work_sessions = self.completed_work_sessions.saturating_add(1);
        next
    }
}

/// Receives phase-completion events for toasts, sounds and the like.
pub trait NotificationSink {
    /// Called once per completed phase, after the next phase is chosen.
    fn on_phase_complete(&mut self, completed: &Phase, next: &Phase);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn on_phase_complete(&mut self, _completed: &Phase, _next: &Phase) {}
}

/// Persisted cycle position, stored beside the engine's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycleSnapshot {
    phase: PhaseKind,
    completed_work_sessions: u32,
}

pub struct PhaseStateMachine<C: Clock = SystemClock> {
    engine: TimerEngine<C>,
    phase: Phase,
    counter: SessionCounter,
    durations: PhaseDurations,
    options: PhaseOptions,
    sink: Box<dyn NotificationSink>,
    cycle_store: Option<TimerStore>,
}

impl<C: Clock> std::fmt::Debug for PhaseStateMachine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseStateMachine")
            .field("engine", &self.engine)
            .field("phase", &self.phase)
            .field("counter", &self.counter)
            .field("durations", &self.durations)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> PhaseStateMachine<C> {
    /// A machine in the Work phase with an Idle countdown.
    pub fn new(
        clock: C,
        durations: PhaseDurations,
        long_break_interval: u32,
        options: PhaseOptions,
    ) -> Self {
        let phase = Phase {
            kind: PhaseKind::Work,
            duration_secs: durations.work_secs,
        };
        Self {
            engine: TimerEngine::new(clock, phase.duration_secs),
            phase,
            counter: SessionCounter::new(long_break_interval),
            durations,
            options,
            sink: Box::new(NullSink),
            cycle_store: None,
        }
    }

    /// Persist the countdown under the store's key and the cycle position
    /// under `<key>:cycle`.
    pub fn with_store(mut self, store: TimerStore) -> Self {
        self.cycle_store = Some(store.scoped("cycle"));
        self.engine = self.engine.with_store(store);
        self
    }

    pub fn with_sink<S: NotificationSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_listener<L: TimerListener + 'static>(mut self, listener: L) -> Self {
        self.engine.set_listener(Box::new(listener));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn counter(&self) -> SessionCounter {
        self.counter
    }

    pub fn engine(&self) -> &TimerEngine<C> {
        &self.engine
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    pub fn options(&self) -> PhaseOptions {
        self.options
    }

    pub fn is_ticking(&self) -> bool {
        self.engine.is_ticking()
    }

    /// The phase a natural completion of the current one would lead to.
    pub fn next_phase_preview(&self) -> Phase {
        let kind = match self.phase.kind {
            PhaseKind::Work => self.counter.next_break(),
            PhaseKind::ShortBreak | PhaseKind::LongBreak => PhaseKind::Work,
        };
        self.phase_for(kind)
    }

    /// Engine snapshot annotated with the cycle position.
    pub fn snapshot(&self) -> Event {
        match self.engine.snapshot() {
            Event::StateSnapshot {
                status,
                remaining_ms,
                total_ms,
                progress,
                at,
                ..
            } => Event::StateSnapshot {
                status,
                remaining_ms,
                total_ms,
                progress,
                phase: Some(self.phase.kind),
                completed_work_sessions: Some(self.counter.completed_work_sessions),
                at,
            },
            other => other,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the current phase's countdown.
    pub fn start(&mut self) -> Result<Event, TimerError> {
        self.engine.start(self.phase.duration_secs)
    }

    /// Pause the countdown. One that already ran out completes and moves
    /// to the next phase instead.
    pub fn pause(&mut self) -> Option<Event> {
        match self.engine.pause()? {
            Event::TimerCompleted { .. } => Some(self.advance()),
            event => Some(event),
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        self.engine.resume()
    }

    /// Put the current phase's countdown back to Idle. The cycle position
    /// is kept.
    pub fn reset(&mut self) -> Event {
        self.engine.arm(self.phase.duration_secs)
    }

    /// Back to the first Work phase with no completed sessions.
    pub fn reset_cycle(&mut self) -> Event {
        self.counter.completed_work_sessions = 0;
        self.phase = self.phase_for(PhaseKind::Work);
        let event = self.engine.arm(self.phase.duration_secs);
        self.save_cycle();
        event
    }

    /// Advance the countdown; on completion move to the next phase.
    ///
    /// Returns `Some(Event::PhaseChanged)` when a phase completed.
    pub fn tick(&mut self) -> Option<Event> {
        self.engine.tick()?;
        Some(self.advance())
    }

    /// Abandon the current countdown and start `target` fresh.
    ///
    /// The session counter only moves when a Work phase is skipped and the
    /// caller says it counts as completed.
    pub fn skip_to(&mut self, target: PhaseKind, count_as_completed: bool) -> Event {
        self.engine.reset();
        if self.phase.kind == PhaseKind::Work && count_as_completed {
            self.counter.record_work();
        }
        self.enter(self.phase_for(target), true)
    }

    /// Skip to the phase that would naturally follow the current one.
    /// An uncounted Work skip goes to a short break.
    pub fn skip(&mut self, count_as_completed: bool) -> Event {
        let target = match self.phase.kind {
            PhaseKind::Work if count_as_completed => self.counter.next_break(),
            PhaseKind::Work => PhaseKind::ShortBreak,
            PhaseKind::ShortBreak | PhaseKind::LongBreak => PhaseKind::Work,
        };
        self.skip_to(target, count_as_completed)
    }

    /// Reload the cycle position and countdown persisted by an earlier
    /// process. A countdown found already completed is advanced now.
    pub fn restore(&mut self) -> Option<Event> {
        let snapshot = self
            .cycle_store
            .as_ref()
            .and_then(|store| store.load_json::<CycleSnapshot>());
        if let Some(snapshot) = snapshot {
            self.phase = self.phase_for(snapshot.phase);
            self.counter.completed_work_sessions = snapshot.completed_work_sessions;
        }
        self.engine.set_default_duration(self.phase.duration_secs);

        let restored = self.engine.restore();
        // A countdown that ran out while nothing was ticking completes here.
        let expired = self.engine.tick().is_some();
        if expired || self.engine.status() == TimerStatus::Completed {
            return Some(self.advance());
        }
        restored
    }

    /// Write the countdown and cycle position; call on teardown.
    pub fn flush(&self) {
        self.engine.flush();
        self.save_cycle();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn phase_for(&self, kind: PhaseKind) -> Phase {
        Phase {
            kind,
            duration_secs: self.durations.for_kind(kind),
        }
    }

    fn advance(&mut self) -> Event {
        let completed = self.phase;
        let next_kind = match completed.kind {
            PhaseKind::Work => self.counter.record_work(),
            PhaseKind::ShortBreak | PhaseKind::LongBreak => PhaseKind::Work,
        };
        let next = self.phase_for(next_kind);
        let event = self.enter(next, self.options.auto_starts(next_kind));
        self.sink.on_phase_complete(&completed, &next);
        event
    }

    fn enter(&mut self, next: Phase, start: bool) -> Event {
        let from = self.phase.kind;
        self.phase = next;
        let started = if start {
            match self.engine.start(next.duration_secs) {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "could not start next phase");
                    false
                }
            }
        } else {
            self.engine.arm(next.duration_secs);
            false
        };
        self.save_cycle();
        tracing::debug!(
            ?from,
            to = ?next.kind,
            completed_work_sessions = self.counter.completed_work_sessions,
            started,
            "phase changed"
        );
        Event::PhaseChanged {
            from,
            to: next.kind,
            completed_work_sessions: self.counter.completed_work_sessions,
            started,
            at: self.engine.clock().now_utc(),
        }
    }

    fn save_cycle(&self) {
        if let Some(store) = &self.cycle_store {
            store.save_json(&CycleSnapshot {
                phase: self.phase.kind,
                completed_work_sessions: self.counter.completed_work_sessions,
            });
        }
    }
}
