use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// One atomic unit of participant-authored text. Identity is stable for the
/// segment's lifetime even if the text is emptied.
#[derive(Debug, Clone)]
pub struct Segment {
    pub question_idx: usize,
    pub segment_idx: usize,
    pub text: String,
    /// Unset until the first analysis dispatch.
    pub last_analyzed_text: Option<String>,
    /// Number of analysis-triggering edits so far.
    pub edit_count: u32,
    /// Open edit bracket, if the participant is mid-edit.
    pub edit_start_ms: Option<u64>,
}

/// Wire-facing view of a segment, used in `sync_state` and `all_segments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentSnapshot {
    pub text: String,
    #[serde(rename = "questionIdx")]
    pub question_idx: usize,
    #[serde(rename = "segmentIdx")]
    pub segment_idx: usize,
}

#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: HashMap<Uuid, Segment>,
    active_editing: Option<Uuid>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty segment at the next position of the question.
    pub fn add(&mut self, question_idx: usize) -> Uuid {
        let segment_idx = self
            .segments
            .values()
            .filter(|s| s.question_idx == question_idx)
            .count();
        let uuid = Uuid::new_v4();
        self.segments.insert(
            uuid,
            Segment {
                question_idx,
                segment_idx,
                text: String::new(),
                last_analyzed_text: None,
                edit_count: 0,
                edit_start_ms: None,
            },
        );
        uuid
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&Segment> {
        self.segments.get(uuid)
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Option<&mut Segment> {
        self.segments.get_mut(uuid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Segment)> {
        self.segments.iter()
    }

    pub fn ids_for_question(&self, question_idx: usize) -> Vec<Uuid> {
        self.segments
            .iter()
            .filter(|(_, s)| s.question_idx == question_idx)
            .map(|(u, _)| *u)
            .collect()
    }

    /// Question indices that currently have at least one segment.
    pub fn question_indices(&self) -> Vec<usize> {
        let mut qs: Vec<usize> = self.segments.values().map(|s| s.question_idx).collect();
        qs.sort_unstable();
        qs.dedup();
        qs
    }

    pub fn active_editing(&self) -> Option<Uuid> {
        self.active_editing
    }

    pub fn set_active_editing(&mut self, uuid: Option<Uuid>) -> Option<Uuid> {
        std::mem::replace(&mut self.active_editing, uuid)
    }

    /// Full map snapshot, sent alongside every `segment_update` so the
    /// backend can run cross-segment consistency checks.
    pub fn snapshot_map(&self) -> HashMap<Uuid, SegmentSnapshot> {
        self.segments
            .iter()
            .map(|(u, s)| {
                (
                    *u,
                    SegmentSnapshot {
                        text: s.text.clone(),
                        question_idx: s.question_idx,
                        segment_idx: s.segment_idx,
                    },
                )
            })
            .collect()
    }

    /// Answers keyed question -> position -> text, for survey submission.
    pub fn answers(&self) -> BTreeMap<usize, BTreeMap<usize, String>> {
        let mut out: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();
        for s in self.segments.values() {
            out.entry(s.question_idx)
                .or_default()
                .insert(s.segment_idx, s.text.clone());
        }
        out
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.active_editing = None;
    }
}
