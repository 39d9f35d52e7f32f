mod engine;
mod phase;
mod state;

pub use engine::{NoopListener, TimerEngine, TimerListener};
pub use phase::{
    NotificationSink, NullSink, Phase, PhaseDurations, PhaseKind, PhaseOptions,
    PhaseStateMachine, SessionCounter,
};
pub use state::{TimerState, TimerStatus};
