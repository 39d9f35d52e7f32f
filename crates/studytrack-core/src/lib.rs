//! # StudyTrack Core Library
//!
//! The timing core behind every timed study tool: Pomodoro sessions,
//! deep-focus sessions, 20-20-20 eye-rest cycles and meditation. Front ends
//! (the CLI, a GUI) are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Clock**: the only source of elapsed time; swappable for tests
//! - **Timer Engine**: a wall-clock countdown that recomputes remaining time
//!   from absolute timestamps on each `tick()`, so a late or throttled
//!   scheduler never causes drift
//! - **Phase State Machine**: work/short-break/long-break cycling with a
//!   long break every N sessions
//! - **Storage**: key-value persistence of in-flight snapshots (SQLite or
//!   in-memory) and TOML configuration
//! - **Driver**: a single-threaded tokio interval that ticks a timer
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: one countdown
//! - [`PhaseStateMachine`]: cycling between work and breaks
//! - [`KvStore`]: persistence contract consumed by the engine
//! - [`Config`]: per-tool duration tables and policy

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{drive, Tickable};
pub use error::{ConfigError, CoreError, Result, StoreError, TimerError};
pub use events::Event;
pub use storage::{Config, Database, KvStore, MemoryStore, TimerStore, Tool};
pub use timer::{
    NotificationSink, Phase, PhaseDurations, PhaseKind, PhaseOptions, PhaseStateMachine,
    TimerEngine, TimerListener, TimerState, TimerStatus,
};
