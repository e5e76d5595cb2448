use crate::error::{ElicitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

/// Lifecycle of a generated candidate requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementState {
    Pending,
    Validated,
    Rejected,
    Stale,
}

impl RequirementState {
    pub fn can_transition(self, next: RequirementState) -> bool {
        use RequirementState::*;
        match (self, next) {
            (Pending, Validated | Rejected | Stale) => true,
            // A validated requirement goes stale if a source segment moves on.
            (Validated, Stale) => true,
            _ => false,
        }
    }
}

/// Whether a segment's current text is covered by some un-stale requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRequirementState {
    NeedsGeneration,
    Generating,
    NoNeedGeneration,
}

impl SegmentRequirementState {
    pub fn can_transition(self, next: SegmentRequirementState) -> bool {
        use SegmentRequirementState::*;
        match (self, next) {
            (NeedsGeneration, Generating) => true,
            // Failure and mid-flight discard both revert to retryable.
            (Generating, NoNeedGeneration | NeedsGeneration) => true,
            (NoNeedGeneration, NeedsGeneration) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub id: String,
    pub text: String,
    /// Source segments this requirement was derived from.
    pub segments: Vec<Uuid>,
    pub question_idx: usize,
}

/// Outcome of an edit hitting a segment that already fed requirements: the
/// requirements that went stale and every segment that must regenerate.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DirtyCascade {
    pub staled_requirements: Vec<String>,
    pub segments_reset: Vec<Uuid>,
}

/// Requirements, their states and ratings, plus per-segment generation
/// state. Requirements are appended, never replaced.
#[derive(Debug, Default)]
pub struct RequirementBook {
    by_question: HashMap<usize, Vec<Requirement>>,
    states: HashMap<String, RequirementState>,
    ratings: HashMap<String, u8>,
    segment_states: HashMap<Uuid, SegmentRequirementState>,
}

impl RequirementBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_question(&self, question_idx: usize) -> &[Requirement] {
        self.by_question
            .get(&question_idx)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn state(&self, id: &str) -> Option<RequirementState> {
        self.states.get(id).copied()
    }

    pub fn rating(&self, id: &str) -> Option<u8> {
        self.ratings.get(id).copied()
    }

    pub fn append(&mut self, requirement: Requirement) {
        self.states
            .insert(requirement.id.clone(), RequirementState::Pending);
        self.by_question
            .entry(requirement.question_idx)
            .or_default()
            .push(requirement);
    }

    fn transition(&mut self, id: &str, next: RequirementState) -> Result<()> {
        let current = self
            .states
            .get(id)
            .copied()
            .ok_or_else(|| ElicitError::UnknownRequirement(id.to_string()))?;
        if !current.can_transition(next) {
            return Err(ElicitError::IllegalTransition {
                entity: "requirement",
                from: format!("{:?}", current),
                to: format!("{:?}", next),
            });
        }
        self.states.insert(id.to_string(), next);
        Ok(())
    }

    /// Validation always carries a rating; the signature makes the
    /// rating-required invariant unrepresentable to skip.
    pub fn validate(&mut self, id: &str, rating: u8) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(ElicitError::RatingOutOfRange(rating));
        }
        self.transition(id, RequirementState::Validated)?;
        self.ratings.insert(id.to_string(), rating);
        Ok(())
    }

    /// Rejection resets every source segment to needs-generation. Returns
    /// the segments that were reset.
    pub fn reject(&mut self, id: &str) -> Result<Vec<Uuid>> {
        self.transition(id, RequirementState::Rejected)?;
        let segments: Vec<Uuid> = self
            .by_question
            .values()
            .flatten()
            .find(|r| r.id == id)
            .map(|r| r.segments.clone())
            .unwrap_or_default();
        for uuid in &segments {
            self.force_segment_state(*uuid, SegmentRequirementState::NeedsGeneration);
        }
        Ok(segments)
    }

    /// An edit to a segment that contributed to pending/validated
    /// requirements marks all of them stale and resets every segment they
    /// reference, not just the edited one.
    pub fn mark_segment_dirty(&mut self, uuid: Uuid) -> DirtyCascade {
        let mut cascade = DirtyCascade::default();
        let mut reset: HashSet<Uuid> = HashSet::new();
        reset.insert(uuid);

        let linked: Vec<Requirement> = self
            .by_question
            .values()
            .flatten()
            .filter(|r| {
                r.segments.contains(&uuid)
                    && matches!(
                        self.states.get(&r.id),
                        Some(RequirementState::Pending | RequirementState::Validated)
                    )
            })
            .cloned()
            .collect();

        for req in linked {
            if self.transition(&req.id, RequirementState::Stale).is_ok() {
                cascade.staled_requirements.push(req.id.clone());
            }
            reset.extend(req.segments.iter().copied());
        }

        for seg in reset {
            self.force_segment_state(seg, SegmentRequirementState::NeedsGeneration);
            cascade.segments_reset.push(seg);
        }
        cascade.segments_reset.sort();
        cascade
    }

    pub fn segment_state(&self, uuid: &Uuid) -> SegmentRequirementState {
        self.segment_states
            .get(uuid)
            .copied()
            .unwrap_or(SegmentRequirementState::NeedsGeneration)
    }

    /// Checked transition; illegal ones are logged and dropped.
    pub fn set_segment_state(&mut self, uuid: Uuid, next: SegmentRequirementState) -> bool {
        let current = self.segment_state(&uuid);
        if current == next {
            return true;
        }
        if !current.can_transition(next) {
            warn!(%uuid, ?current, ?next, "rejected illegal segment generation transition");
            return false;
        }
        self.segment_states.insert(uuid, next);
        true
    }

    fn force_segment_state(&mut self, uuid: Uuid, next: SegmentRequirementState) {
        self.segment_states.insert(uuid, next);
    }

    pub fn pending_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == RequirementState::Pending)
            .count()
    }

    pub fn clear(&mut self) {
        self.by_question.clear();
        self.states.clear();
        self.ratings.clear();
        self.segment_states.clear();
    }
}
