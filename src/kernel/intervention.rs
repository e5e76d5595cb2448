use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence thresholds for panel eligibility, per intervention type.
const PANEL_THRESHOLD_MULTIPLE_CHOICE: f64 = 0.8;
const PANEL_THRESHOLD_CLARIFICATION: f64 = 0.6;
const PANEL_THRESHOLD_CONSISTENCY: f64 = 0.95;
/// Assumed when the backend omits a confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// A segment referenced by a consistency intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentRef {
    pub uuid: Uuid,
    pub text: String,
}

/// The closed set of issue variants the backend can raise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterventionKind {
    /// Trigger phrase plus candidate rewordings to pick from.
    AmbiguityMultipleChoice {
        trigger_phrase: String,
        suggestions: Vec<String>,
    },
    /// Trigger phrase, resolved by free-text clarification.
    AmbiguityClarification { trigger_phrase: String },
    /// Cross-segment contradiction; resolvable by editing either side.
    Consistency {
        previous_segment: SegmentRef,
        current_segment: SegmentRef,
    },
}

impl InterventionKind {
    /// Panel ranking priority: multiple-choice first, everything else after.
    pub fn panel_priority(&self) -> u8 {
        match self {
            InterventionKind::AmbiguityMultipleChoice { .. } => 1,
            _ => 2,
        }
    }

    pub fn panel_threshold(&self) -> f64 {
        match self {
            InterventionKind::AmbiguityMultipleChoice { .. } => PANEL_THRESHOLD_MULTIPLE_CHOICE,
            InterventionKind::AmbiguityClarification { .. } => PANEL_THRESHOLD_CLARIFICATION,
            InterventionKind::Consistency { .. } => PANEL_THRESHOLD_CONSISTENCY,
        }
    }

    /// Does this intervention reference `uuid` as either side of a
    /// consistency check?
    pub fn references(&self, uuid: &Uuid) -> bool {
        match self {
            InterventionKind::Consistency {
                previous_segment,
                current_segment,
            } => previous_segment.uuid == *uuid || current_segment.uuid == *uuid,
            _ => false,
        }
    }
}

/// Terminal resolution of an intervention. `Dismiss` is the bulk/auto
/// vocabulary, `Dismissed` the individual one; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionResponse {
    Applied,
    Dismissed,
    Dismiss,
}

/// Placement strategy for showing interventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Confidence-ranked automatic mix of panel and inline.
    Default,
    Panel,
    Inline,
}

#[derive(Debug, Clone)]
pub struct Intervention {
    pub id: String,
    /// Owning segment.
    pub segment: Uuid,
    pub question_idx: usize,
    pub kind: InterventionKind,
    pub confidence: Option<f64>,
    pub response: Option<InterventionResponse>,
    pub appearance_ms: u64,
    pub first_interaction_ms: Option<u64>,
    pub response_ms: Option<u64>,
    /// Underlying text changed before resolution.
    pub is_stale: bool,
    pub feedback_submitted: bool,
    /// Auto-dismiss deadline, armed when a stale intervention sits inline.
    pub dismiss_deadline_ms: Option<u64>,
}

impl Intervention {
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Unresolved, regardless of staleness.
    pub fn is_open(&self) -> bool {
        self.response.is_none()
    }

    /// Unresolved and non-stale: what "active" counts mean everywhere.
    pub fn is_active(&self) -> bool {
        self.response.is_none() && !self.is_stale
    }

    pub fn meets_panel_threshold(&self) -> bool {
        self.confidence() > self.kind.panel_threshold()
    }
}

/// Active-intervention counts reported with response telemetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveCounts {
    pub total: usize,
    #[serde(rename = "forSegment")]
    pub for_segment: usize,
}

/// Owns intervention state and the display-placement algorithm.
/// Interventions are never deleted, only marked resolved or stale; the full
/// trail is kept for audit and feedback.
#[derive(Debug, Default)]
pub struct InterventionSet {
    items: Vec<Intervention>,
}

impl InterventionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intervention: Intervention) {
        self.items.push(intervention);
    }

    pub fn get(&self, id: &str) -> Option<&Intervention> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Intervention> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intervention> {
        self.items.iter()
    }

    pub fn active_counts(&self, target: Option<Uuid>) -> ActiveCounts {
        let active: Vec<&Intervention> = self.items.iter().filter(|i| i.is_active()).collect();
        ActiveCounts {
            total: active.len(),
            for_segment: target
                .map(|u| active.iter().filter(|i| i.segment == u).count())
                .unwrap_or(0),
        }
    }

    /// Unresolved interventions on a segment, stale or not. Blocks the
    /// re-analysis dispatch after an applied edit.
    pub fn open_on_segment(&self, uuid: &Uuid) -> usize {
        self.items
            .iter()
            .filter(|i| i.segment == *uuid && i.is_open())
            .count()
    }

    pub fn unresolved_nonstale(&self) -> usize {
        self.items.iter().filter(|i| i.is_active()).count()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.is_active())
            .map(|i| i.id.clone())
            .collect()
    }

    /// Editing a segment invalidates all of its own open interventions.
    /// Returns the ids that were newly marked stale.
    pub fn mark_all_stale(&mut self, uuid: &Uuid) -> Vec<String> {
        let mut staled = Vec::new();
        for i in &mut self.items {
            if i.segment == *uuid && i.is_open() && !i.is_stale {
                i.is_stale = true;
                staled.push(i.id.clone());
            }
        }
        staled
    }

    /// Editing a segment also invalidates any other segment's open
    /// consistency intervention that cross-references it.
    pub fn mark_consistency_stale(&mut self, uuid: &Uuid) -> Vec<String> {
        let mut staled = Vec::new();
        for i in &mut self.items {
            if i.is_open() && !i.is_stale && i.kind.references(uuid) {
                i.is_stale = true;
                staled.push(i.id.clone());
            }
        }
        staled
    }

    /// Display arbitration: a stable greedy top-k, recomputed on every
    /// query. Global override wins; otherwise the top `max_panel` active,
    /// threshold-eligible interventions of the question go to the panel,
    /// ranked by (type priority, confidence desc, id). The id tie-break
    /// keeps equal inputs deterministic.
    pub fn display_mode(
        &self,
        id: &str,
        global: DisplayMode,
        max_panel: usize,
    ) -> Option<DisplayMode> {
        let target = self.get(id)?;
        if global != DisplayMode::Default {
            return Some(global);
        }
        if !target.meets_panel_threshold() {
            return Some(DisplayMode::Inline);
        }

        let mut eligible: Vec<&Intervention> = self
            .items
            .iter()
            .filter(|i| {
                i.is_active()
                    && i.question_idx == target.question_idx
                    && i.meets_panel_threshold()
            })
            .collect();
        eligible.sort_by(|a, b| {
            a.kind
                .panel_priority()
                .cmp(&b.kind.panel_priority())
                .then(
                    b.confidence()
                        .partial_cmp(&a.confidence())
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.id.cmp(&b.id))
        });

        let position = eligible.iter().position(|i| i.id == id);
        match position {
            Some(p) if p < max_panel => Some(DisplayMode::Panel),
            // Resolved or stale interventions never re-enter arbitration.
            _ => Some(DisplayMode::Inline),
        }
    }

    /// Ids of open stale interventions whose auto-dismiss deadline has
    /// passed.
    pub fn due_for_dismiss(&self, now_ms: u64) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| {
                i.is_open()
                    && i.is_stale
                    && i.dismiss_deadline_ms.map(|d| now_ms >= d).unwrap_or(false)
            })
            .map(|i| i.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
