use serde::{Deserialize, Serialize};

/// Tunables for one survey session. The defaults are the values the study
/// shipped with; nothing reads them from the environment yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend message-channel endpoint.
    pub ws_url: String,
    /// Minimum segment text length before analysis is worth dispatching.
    pub min_analyze_len: usize,
    /// Soft inactivity threshold: ask the backend for a stability verdict.
    pub soft_inactivity_ms: u64,
    /// Hard inactivity threshold: force requirement generation.
    pub hard_inactivity_ms: u64,
    /// Panel placement cap per question.
    pub max_panel_count: usize,
    /// Grace period before a stale inline intervention is auto-dismissed.
    pub stale_dismiss_ms: u64,
    /// Sliding window for the activity recorder.
    pub activity_window_ms: u64,
    /// How much history a feedback timeline should ideally span.
    pub timeline_target_ms: u64,
    /// Reconnect backoff unit; delay is attempt * base.
    pub reconnect_base_ms: u64,
    /// Reconnect ceiling; beyond this the client stays disconnected.
    pub max_reconnect_attempts: u32,
    /// Pre/post comparison study arm. Adds the baseline submission gate.
    pub baseline_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".to_string(),
            min_analyze_len: 5,
            soft_inactivity_ms: 10_000,
            hard_inactivity_ms: 120_000,
            max_panel_count: 3,
            stale_dismiss_ms: 2_000,
            activity_window_ms: 120_000,
            timeline_target_ms: 60_000,
            reconnect_base_ms: 2_000,
            max_reconnect_attempts: 5,
            baseline_enabled: false,
        }
    }
}
