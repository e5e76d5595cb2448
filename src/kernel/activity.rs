use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Low-level user activity captured for feedback context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TypingStarted,
    TypingStopped,
    SegmentFocusChanged,
    Scroll,
    CursorMoved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    #[serde(rename = "eventType")]
    pub kind: ActivityKind,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseKind {
    Pause,
    Resume,
}

/// Marks a tracking suspension boundary. Paused intervals are subtracted
/// when computing an event's effective age.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PauseEvent {
    #[serde(rename = "eventType")]
    pub kind: PauseKind,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Total paused time overlapping (`since`, `now`]. An open pause interval is
/// closed at `now`.
fn paused_overlap(pauses: &[PauseEvent], since: u64, now_ms: u64) -> u64 {
    let mut total = 0;
    for (idx, p) in pauses.iter().enumerate() {
        if p.kind == PauseKind::Pause && p.timestamp > since && p.timestamp <= now_ms {
            let pause_end = pauses
                .get(idx + 1)
                .map(|r| r.timestamp)
                .unwrap_or(now_ms);
            total += pause_end.saturating_sub(p.timestamp);
        }
    }
    total
}

/// Timeline attached to a resolved intervention's feedback. Never invents
/// data: `is_full_duration` says whether the target span was available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTimeline {
    pub events: Vec<ActivityEvent>,
    #[serde(rename = "pauseResumeEvents")]
    pub pause_resume_events: Vec<PauseEvent>,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    #[serde(rename = "endTime")]
    pub end_time: u64,
    #[serde(rename = "isFullDuration")]
    pub is_full_duration: bool,
}

/// Bounded sliding-window buffer of activity events with pause/resume
/// semantics. Recording is fully suppressed while paused.
#[derive(Debug)]
pub struct ActivityRecorder {
    events: VecDeque<ActivityEvent>,
    pause_resume: Vec<PauseEvent>,
    paused: bool,
    last_pause_start: Option<u64>,
    window_ms: u64,
    target_ms: u64,
}

impl ActivityRecorder {
    pub fn new(window_ms: u64, target_ms: u64) -> Self {
        Self {
            events: VecDeque::new(),
            pause_resume: Vec::new(),
            paused: false,
            last_pause_start: None,
            window_ms,
            target_ms,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn record(&mut self, event: ActivityEvent, now_ms: u64) {
        if self.paused {
            return;
        }
        self.events.push_back(event);
        self.prune(now_ms);
    }

    /// Drops events whose effective age (wall-clock age minus overlapping
    /// paused time) exceeds the window.
    fn prune(&mut self, now_ms: u64) {
        let window = self.window_ms;
        let pauses = &self.pause_resume;
        self.events.retain(|e| {
            let age = now_ms.saturating_sub(e.timestamp);
            let paused = paused_overlap(pauses, e.timestamp, now_ms);
            age.saturating_sub(paused) <= window
        });
    }

    /// Invoked when the feedback modal opens.
    pub fn pause(&mut self, now_ms: u64) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.last_pause_start = Some(now_ms);
        self.pause_resume.push(PauseEvent {
            kind: PauseKind::Pause,
            timestamp: now_ms,
            context: None,
        });
    }

    /// Invoked when the feedback modal closes. The paused duration is kept
    /// on the resume record for diagnostics.
    pub fn resume(&mut self, now_ms: u64) {
        if !self.paused {
            return;
        }
        let paused_for = self
            .last_pause_start
            .map(|s| now_ms.saturating_sub(s))
            .unwrap_or(0);
        debug!(paused_for_ms = paused_for, "activity tracking resumed");
        self.paused = false;
        self.last_pause_start = None;
        self.pause_resume.push(PauseEvent {
            kind: PauseKind::Resume,
            timestamp: now_ms,
            context: Some(serde_json::json!({ "pauseDuration": paused_for })),
        });
    }

    /// All buffered events up to `response_ms`, oldest first, plus the
    /// overlapping pause/resume records.
    pub fn timeline(&self, response_ms: u64) -> ActivityTimeline {
        let mut events: Vec<ActivityEvent> = self
            .events
            .iter()
            .filter(|e| e.timestamp <= response_ms)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);

        let start_time = events.first().map(|e| e.timestamp).unwrap_or(response_ms);
        let pause_resume_events = self
            .pause_resume
            .iter()
            .filter(|p| p.timestamp >= start_time && p.timestamp <= response_ms)
            .cloned()
            .collect();

        ActivityTimeline {
            is_full_duration: response_ms.saturating_sub(start_time) >= self.target_ms,
            events,
            pause_resume_events,
            start_time,
            end_time: response_ms,
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.pause_resume.clear();
        self.paused = false;
        self.last_pause_start = None;
    }
}
