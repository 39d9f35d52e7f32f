use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{PhaseKind, TimerStatus};

/// Every state change in a timer produces an Event.
/// Front ends render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        total_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A persisted snapshot was adopted.
    StateRestored {
        status: TimerStatus,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: PhaseKind,
        to: PhaseKind,
        completed_work_sessions: u32,
        /// Whether the new phase's countdown is already running.
        started: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        remaining_ms: u64,
        total_ms: u64,
        progress: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<PhaseKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed_work_sessions: Option<u32>,
        at: DateTime<Utc>,
    },
}
