//! Periodic scheduler for timers.
//!
//! One `tokio::time::interval` per driven timer on the current task; no
//! worker threads. Missed firings are skipped rather than replayed in a
//! burst, which is safe because the engine derives remaining time from
//! the wall clock on each tick.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::events::Event;
use crate::timer::{PhaseStateMachine, TimerEngine};

/// Something with a periodic tick.
pub trait Tickable {
    /// Returns `Some` when the tick completed a countdown.
    fn tick(&mut self) -> Option<Event>;

    fn is_ticking(&self) -> bool;
}

impl<C: Clock> Tickable for TimerEngine<C> {
    fn tick(&mut self) -> Option<Event> {
        TimerEngine::tick(self)
    }

    fn is_ticking(&self) -> bool {
        TimerEngine::is_ticking(self)
    }
}

impl<C: Clock> Tickable for PhaseStateMachine<C> {
    fn tick(&mut self) -> Option<Event> {
        PhaseStateMachine::tick(self)
    }

    fn is_ticking(&self) -> bool {
        PhaseStateMachine::is_ticking(self)
    }
}

/// Tick `target` every `period` until it stops ticking, or until
/// `max_completions` countdowns have completed.
///
/// Completion events are handed to `on_event`. Returns the number of
/// completions observed.
pub async fn drive<T, F>(
    target: &mut T,
    period: Duration,
    max_completions: Option<usize>,
    mut on_event: F,
) -> usize
where
    T: Tickable + ?Sized,
    F: FnMut(&Event),
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut completions = 0;
    while target.is_ticking() {
        interval.tick().await;
        if let Some(event) = target.tick() {
            completions += 1;
            on_event(&event);
            if max_completions.is_some_and(|max| completions >= max) {
                break;
            }
        }
    }
    completions
}
