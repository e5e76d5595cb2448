use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Per-segment analysis lifecycle. Transitions are driven only by the
/// coordinator (dispatch) and by channel responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Idle,
    Pending,
    Completed,
    Error,
    Cancelled,
}

impl AnalysisStatus {
    /// (current, next) -> legal? Terminal statuses may only be left by a
    /// fresh dispatch; a completion for a segment we never dispatched is
    /// rejected rather than trusted.
    pub fn can_transition(self, next: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        match (self, next) {
            (Idle, Pending) => true,
            (Pending, Pending | Completed | Error | Cancelled) => true,
            (Completed | Error | Cancelled, Pending) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnalysisStatus::Idle => "idle",
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Error => "error",
            AnalysisStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Session-wide toggle gating automatic analysis dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    On,
    Off,
}

impl AnalysisMode {
    pub fn toggled(self) -> Self {
        match self {
            AnalysisMode::On => AnalysisMode::Off,
            AnalysisMode::Off => AnalysisMode::On,
        }
    }
}

/// Decides whether a segment's text is due for server analysis and tracks
/// per-segment status. The dispatch side effects themselves are assembled by
/// the store, which owns the neighbouring state.
#[derive(Debug)]
pub struct AnalysisCoordinator {
    status: HashMap<Uuid, AnalysisStatus>,
    pub mode: AnalysisMode,
    min_len: usize,
}

impl AnalysisCoordinator {
    pub fn new(min_len: usize) -> Self {
        Self {
            status: HashMap::new(),
            mode: AnalysisMode::On,
            min_len,
        }
    }

    /// The debounce rule: long enough, and different from what was last
    /// actually analyzed. Re-dispatch with identical text is a no-op.
    pub fn should_dispatch(&self, text: &str, last_analyzed: Option<&str>) -> bool {
        text.len() >= self.min_len && last_analyzed != Some(text)
    }

    pub fn status(&self, uuid: &Uuid) -> AnalysisStatus {
        self.status.get(uuid).copied().unwrap_or(AnalysisStatus::Idle)
    }

    pub fn status_map(&self) -> &HashMap<Uuid, AnalysisStatus> {
        &self.status
    }

    /// Applies a transition, rejecting illegal ones. Returns whether the
    /// status was actually updated.
    pub fn set_status(&mut self, uuid: Uuid, next: AnalysisStatus) -> bool {
        let current = self.status(&uuid);
        if !current.can_transition(next) {
            warn!(%uuid, %current, %next, "rejected illegal analysis transition");
            return false;
        }
        self.status.insert(uuid, next);
        true
    }

    pub fn clear(&mut self) {
        self.status.clear();
    }
}
