//! Serializable countdown snapshot.
//!
//! Remaining time is never stored. It is derived from the absolute start
//! timestamp and the elapsed time banked at the last pause, so a snapshot
//! written before a restart still yields the right answer afterward.

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Snapshot of one countdown.
///
/// Serialized layout:
///
/// ```text
/// { "status": "Running", "totalDurationMs": 1500000,
///   "startTimestamp": 1700000000000, "elapsedAtPauseMs": 0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    /// Configured duration of the countdown, fixed for its lifetime.
    pub total_duration_ms: u64,
    /// Epoch milliseconds at which the current Running period began.
    pub start_timestamp: u64,
    /// Elapsed time consumed before the current Running period.
    pub elapsed_at_pause_ms: u64,
}

impl TimerState {
    /// A fresh, unstarted countdown of `total_ms`.
    pub fn idle(total_ms: u64) -> Self {
        Self {
            status: TimerStatus::Idle,
            total_duration_ms: total_ms,
            start_timestamp: 0,
            elapsed_at_pause_ms: 0,
        }
    }

    /// Time budget left when the current Running period began.
    fn budget_ms(&self) -> u64 {
        self.total_duration_ms
            .saturating_sub(self.elapsed_at_pause_ms)
    }

    pub fn target_end_ms(&self) -> u64 {
        self.start_timestamp.saturating_add(self.budget_ms())
    }

    /// Remaining time at `now_ms`.
    ///
    /// Capped at the remaining budget so a clock reading earlier than the
    /// start timestamp never reports more time than the countdown has.
    pub fn remaining_ms_at(&self, now_ms: u64) -> u64 {
        match self.status {
            TimerStatus::Running => self
                .target_end_ms()
                .saturating_sub(now_ms)
                .min(self.budget_ms()),
            TimerStatus::Idle | TimerStatus::Paused => self.budget_ms(),
            TimerStatus::Completed => 0,
        }
    }

    pub fn elapsed_ms_at(&self, now_ms: u64) -> u64 {
        self.total_duration_ms
            .saturating_sub(self.remaining_ms_at(now_ms))
    }

    /// 0.0 .. 1.0 progress through the countdown.
    pub fn progress_at(&self, now_ms: u64) -> f64 {
        if self.total_duration_ms == 0 {
            return if self.status == TimerStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        self.elapsed_ms_at(now_ms) as f64 / self.total_duration_ms as f64
    }

    /// Structural checks applied before a snapshot is adopted.
    pub fn validate(&self) -> Result<(), TimerError> {
        if self.elapsed_at_pause_ms > self.total_duration_ms {
            return Err(TimerError::InvalidState(format!(
                "elapsedAtPauseMs ({}) exceeds totalDurationMs ({})",
                self.elapsed_at_pause_ms, self.total_duration_ms
            )));
        }
        if self.status == TimerStatus::Running && self.start_timestamp == 0 {
            return Err(TimerError::InvalidState(
                "running snapshot has no startTimestamp".into(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a persisted snapshot. Missing fields, non-numeric timestamps
    /// and unknown statuses are all reported as `InvalidState`.
    pub fn from_json(json: &str) -> Result<Self, TimerError> {
        serde_json::from_str(json).map_err(|e| TimerError::InvalidState(e.to_string()))
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paused(total: u64, elapsed: u64) -> TimerState {
        TimerState {
            status: TimerStatus::Paused,
            total_duration_ms: total,
            start_timestamp: 10_000,
            elapsed_at_pause_ms: elapsed,
        }
    }

    #[test]
    fn serializes_with_camel_case_layout() {
        let state = TimerState {
            status: TimerStatus::Running,
            total_duration_ms: 60_000,
            start_timestamp: 1_700_000_000_000,
            elapsed_at_pause_ms: 5_000,
        };
        let json: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "Running");
        assert_eq!(json["totalDurationMs"], 60_000);
        assert_eq!(json["startTimestamp"], 1_700_000_000_000u64);
        assert_eq!(json["elapsedAtPauseMs"], 5_000);
    }

    #[test]
    fn running_remaining_uses_target_end() {
        let state = TimerState {
            status: TimerStatus::Running,
            total_duration_ms: 60_000,
            start_timestamp: 100_000,
            elapsed_at_pause_ms: 20_000,
        };
        assert_eq!(state.target_end_ms(), 140_000);
        assert_eq!(state.remaining_ms_at(100_000), 40_000);
        assert_eq!(state.remaining_ms_at(130_000), 10_000);
        assert_eq!(state.remaining_ms_at(500_000), 0);
    }

    #[test]
    fn running_remaining_is_capped_when_clock_is_behind_start() {
        let state = TimerState {
            status: TimerStatus::Running,
            total_duration_ms: 60_000,
            start_timestamp: 100_000,
            elapsed_at_pause_ms: 0,
        };
        assert_eq!(state.remaining_ms_at(10_000), 60_000);
    }

    #[test]
    fn paused_remaining_ignores_clock() {
        let state = paused(1_500_000, 300_000);
        assert_eq!(state.remaining_ms_at(0), 1_200_000);
        assert_eq!(state.remaining_ms_at(u64::MAX), 1_200_000);
    }

    #[test]
    fn progress_spans_zero_to_one() {
        let state = paused(100_000, 25_000);
        assert!((state.progress_at(0) - 0.25).abs() < f64::EPSILON);
        let done = TimerState {
            status: TimerStatus::Completed,
            ..TimerState::idle(0)
        };
        assert_eq!(done.progress_at(0), 1.0);
        assert_eq!(TimerState::idle(0).progress_at(0), 0.0);
    }

    #[test]
    fn validate_rejects_overconsumed_snapshot() {
        assert!(paused(1_000, 1_000).validate().is_ok());
        assert!(matches!(
            paused(1_000, 1_001).validate(),
            Err(TimerError::InvalidState(_))
        ));
    }

    #[test]
    fn validate_rejects_running_without_start() {
        let state = TimerState {
            status: TimerStatus::Running,
            ..TimerState::idle(1_000)
        };
        assert!(state.validate().is_err());
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(TimerState::from_json("not json").is_err());
        assert!(TimerState::from_json(r#"{"status":"Idle"}"#).is_err());
        assert!(TimerState::from_json(
            r#"{"status":"Paused","totalDurationMs":1000,"startTimestamp":"soon","elapsedAtPauseMs":0}"#
        )
        .is_err());
        assert!(TimerState::from_json(
            r#"{"status":"Sleeping","totalDurationMs":1000,"startTimestamp":1,"elapsedAtPauseMs":0}"#
        )
        .is_err());
    }

    #[test]
    fn from_json_accepts_persisted_layout() {
        let state = TimerState::from_json(
            r#"{"status":"Paused","totalDurationMs":1500000,"startTimestamp":0,"elapsedAtPauseMs":300000}"#,
        )
        .unwrap();
        assert_eq!(state.status, TimerStatus::Paused);
        assert_eq!(state.remaining_ms_at(0), 1_200_000);
    }
}
