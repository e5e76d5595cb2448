use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// What caused a requirement-generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    Manual,
    Stability,
    Timeout,
    SurveyEnd,
}

/// A backend-reported generation failure, kept per-question for display.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationError {
    pub error: String,
    pub details: Option<serde_json::Value>,
    pub timestamp: u64,
}

/// Per-question dual-threshold deadline pair. Deadlines are replaced
/// wholesale on every qualifying activity (reset, not extended); a deadline
/// fires at most once per arming.
#[derive(Debug, Clone)]
struct QuestionMonitor {
    last_activity_ms: u64,
    soft_deadline_ms: Option<u64>,
    hard_deadline_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFire {
    /// Soft threshold elapsed: ask the backend for a stability verdict.
    Soft(usize),
    /// Hard cutoff: generate unconditionally.
    Hard(usize),
}

/// Inactivity monitoring and generation bookkeeping for every question.
/// Pure deadline arithmetic; the store turns fires into effects and the
/// driver supplies the clock.
#[derive(Debug)]
pub struct InactivityScheduler {
    monitors: HashMap<usize, QuestionMonitor>,
    pending_generation: HashSet<usize>,
    errors: HashMap<usize, GenerationError>,
    soft_ms: u64,
    hard_ms: u64,
}

impl InactivityScheduler {
    pub fn new(soft_ms: u64, hard_ms: u64) -> Self {
        Self {
            monitors: HashMap::new(),
            pending_generation: HashSet::new(),
            errors: HashMap::new(),
            soft_ms,
            hard_ms,
        }
    }

    pub fn is_monitoring(&self, question_idx: usize) -> bool {
        self.monitors.contains_key(&question_idx)
    }

    /// Arms both timers if the question is not already monitored.
    pub fn ensure_monitoring(&mut self, question_idx: usize, now_ms: u64) {
        if self.monitors.contains_key(&question_idx) {
            return;
        }
        debug!(question_idx, "starting inactivity monitor");
        self.monitors.insert(
            question_idx,
            QuestionMonitor {
                last_activity_ms: now_ms,
                soft_deadline_ms: Some(now_ms + self.soft_ms),
                hard_deadline_ms: Some(now_ms + self.hard_ms),
            },
        );
    }

    /// Resets both deadlines. Returns false if the question is not
    /// monitored (activity on unmonitored questions is ignored here).
    pub fn record_activity(&mut self, question_idx: usize, now_ms: u64) -> bool {
        match self.monitors.get_mut(&question_idx) {
            Some(m) => {
                m.last_activity_ms = now_ms;
                m.soft_deadline_ms = Some(now_ms + self.soft_ms);
                m.hard_deadline_ms = Some(now_ms + self.hard_ms);
                true
            }
            None => false,
        }
    }

    /// Fires every due deadline. Each deadline is disarmed when it fires, so
    /// a soft fire happens once per arming even if `tick` keeps coming.
    pub fn tick(&mut self, now_ms: u64) -> Vec<TimerFire> {
        let mut fires = Vec::new();
        let mut questions: Vec<usize> = self.monitors.keys().copied().collect();
        questions.sort_unstable();
        for q in questions {
            let Some(m) = self.monitors.get_mut(&q) else {
                continue;
            };
            if let Some(d) = m.soft_deadline_ms {
                if now_ms >= d {
                    m.soft_deadline_ms = None;
                    fires.push(TimerFire::Soft(q));
                }
            }
            if let Some(d) = m.hard_deadline_ms {
                if now_ms >= d {
                    m.hard_deadline_ms = None;
                    fires.push(TimerFire::Hard(q));
                }
            }
        }
        fires
    }

    /// Guard for a late stability verdict: the soft interval must have
    /// genuinely elapsed since the last reset, otherwise the answer belongs
    /// to a window that activity has since invalidated.
    pub fn stability_window_elapsed(&self, question_idx: usize, now_ms: u64) -> bool {
        self.monitors
            .get(&question_idx)
            .map(|m| now_ms.saturating_sub(m.last_activity_ms) >= self.soft_ms)
            .unwrap_or(false)
    }

    /// Disarms deadlines but keeps the monitor alive; used when a
    /// generation request goes out.
    pub fn clear_deadlines(&mut self, question_idx: usize) {
        if let Some(m) = self.monitors.get_mut(&question_idx) {
            m.soft_deadline_ms = None;
            m.hard_deadline_ms = None;
        }
    }

    pub fn stop(&mut self, question_idx: usize) {
        if self.monitors.remove(&question_idx).is_some() {
            debug!(question_idx, "stopped inactivity monitor");
        }
    }

    pub fn is_pending(&self, question_idx: usize) -> bool {
        self.pending_generation.contains(&question_idx)
    }

    pub fn set_pending(&mut self, question_idx: usize) {
        self.pending_generation.insert(question_idx);
    }

    pub fn clear_pending(&mut self, question_idx: usize) {
        self.pending_generation.remove(&question_idx);
    }

    pub fn any_pending(&self) -> bool {
        !self.pending_generation.is_empty()
    }

    pub fn pending_questions(&self) -> Vec<usize> {
        let mut qs: Vec<usize> = self.pending_generation.iter().copied().collect();
        qs.sort_unstable();
        qs
    }

    pub fn record_error(&mut self, question_idx: usize, error: GenerationError) {
        self.errors.insert(question_idx, error);
    }

    pub fn clear_error(&mut self, question_idx: usize) {
        self.errors.remove(&question_idx);
    }

    pub fn error(&self, question_idx: usize) -> Option<&GenerationError> {
        self.errors.get(&question_idx)
    }

    pub fn clear(&mut self) {
        self.monitors.clear();
        self.pending_generation.clear();
        self.errors.clear();
    }
}
