//! Integration tests for surviving a process restart.
//!
//! Each test builds a timer over an on-disk SQLite store, drops it, then
//! builds a fresh one over the same file and checks what it restores.

use std::path::Path;
use std::rc::Rc;

use studytrack_core::{
    Database, Event, KvStore, ManualClock, PhaseDurations, PhaseKind, PhaseOptions,
    PhaseStateMachine, TimerEngine, TimerStatus, TimerStore, Tool,
};

const MIN: u64 = 60_000;
const EPOCH: u64 = 1_700_000_000_000;

fn store_at(path: &Path, tool: Tool) -> TimerStore {
    let db: Rc<dyn KvStore> = Rc::new(Database::open_at(path).unwrap());
    TimerStore::new(db, tool.storage_key())
}

fn pomodoro(path: &Path, clock: ManualClock) -> PhaseStateMachine<ManualClock> {
    PhaseStateMachine::new(clock, PhaseDurations::default(), 4, PhaseOptions::default())
        .with_store(store_at(path, Tool::Pomodoro))
}

#[test]
fn test_running_countdown_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studytrack.db");

    let clock = ManualClock::new(EPOCH);
    let mut first = pomodoro(&path, clock.clone());
    first.start().unwrap();
    clock.advance(10 * MIN);
    first.flush();
    drop(first);

    // Five minutes pass while nothing is running.
    let clock = ManualClock::new(EPOCH + 15 * MIN);
    let mut second = pomodoro(&path, clock);
    let restored = second.restore();

    assert!(matches!(
        restored,
        Some(Event::StateRestored {
            status: TimerStatus::Running,
            ..
        })
    ));
    assert_eq!(second.phase().kind, PhaseKind::Work);
    assert_eq!(second.engine().remaining_ms(), 10 * MIN);
}

#[test]
fn test_paused_countdown_does_not_lose_time_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studytrack.db");

    let clock = ManualClock::new(EPOCH);
    let mut first = pomodoro(&path, clock.clone());
    first.start().unwrap();
    clock.advance(5 * MIN);
    first.pause();
    drop(first);

    let mut second = pomodoro(&path, ManualClock::new(EPOCH + 3 * 60 * MIN));
    second.restore();

    assert_eq!(second.engine().status(), TimerStatus::Paused);
    assert_eq!(second.engine().remaining_ms(), 20 * MIN);
}

#[test]
fn test_countdown_that_ended_while_closed_advances_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studytrack.db");

    let mut first = pomodoro(&path, ManualClock::new(EPOCH));
    first.start().unwrap();
    drop(first);

    let mut second = pomodoro(&path, ManualClock::new(EPOCH + 40 * MIN));
    let restored = second.restore();

    assert!(matches!(
        restored,
        Some(Event::PhaseChanged {
            from: PhaseKind::Work,
            to: PhaseKind::ShortBreak,
            completed_work_sessions: 1,
            started: false,
            ..
        })
    ));
    assert_eq!(second.engine().status(), TimerStatus::Idle);
    assert_eq!(second.engine().remaining_ms(), 5 * MIN);
}

#[test]
fn test_tools_do_not_share_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studytrack.db");

    let clock = ManualClock::new(EPOCH);
    let mut focus =
        TimerEngine::new(clock.clone(), 50 * 60).with_store(store_at(&path, Tool::DeepFocus));
    focus.start(50 * 60).unwrap();
    drop(focus);

    let mut meditation =
        TimerEngine::new(clock, 10 * 60).with_store(store_at(&path, Tool::Meditation));
    assert_eq!(meditation.restore(), None);
    assert_eq!(meditation.status(), TimerStatus::Idle);
}

#[test]
fn test_full_cycle_reaches_long_break_and_persists_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studytrack.db");

    let clock = ManualClock::new(EPOCH);
    let options = PhaseOptions {
        auto_start_breaks: true,
        auto_start_work: true,
    };
    let mut machine = PhaseStateMachine::new(clock.clone(), PhaseDurations::default(), 4, options)
        .with_store(store_at(&path, Tool::Pomodoro));
    machine.start().unwrap();

    let mut seen = Vec::new();
    // Four work phases and three short breaks.
    for _ in 0..7 {
        clock.advance(machine.engine().remaining_ms());
        if let Some(Event::PhaseChanged { to, .. }) = machine.tick() {
            seen.push(to);
        }
    }
    assert_eq!(seen.last(), Some(&PhaseKind::LongBreak));
    assert_eq!(
        seen.iter().filter(|kind| **kind == PhaseKind::ShortBreak).count(),
        3
    );
    drop(machine);

    let mut reopened = pomodoro(&path, clock);
    reopened.restore();
    assert_eq!(reopened.phase().kind, PhaseKind::LongBreak);
    assert_eq!(reopened.counter().completed_work_sessions, 4);
    assert_eq!(reopened.engine().status(), TimerStatus::Running);
}
