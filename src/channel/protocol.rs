//! Wire contract with the analysis backend. JSON payloads discriminated by
//! a `type` tag; field spellings follow the deployed backend exactly, which
//! mixes camelCase and snake_case per message.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::kernel::activity::ActivityTimeline;
use crate::kernel::analysis::{AnalysisMode, AnalysisStatus};
use crate::kernel::event::InitiativeMode;
use crate::kernel::intervention::{
    ActiveCounts, DisplayMode, InterventionKind, InterventionResponse,
};
use crate::kernel::scheduler::TriggerMode;
use crate::kernel::segment::SegmentSnapshot;

/// Epoch milliseconds -> RFC 3339, the timestamp format the wire carries.
pub fn iso_millis(ms: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Segment handed to requirement generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSegment {
    pub uuid: Uuid,
    pub text: String,
}

/// Accumulated answers shipped at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalState {
    pub answers: BTreeMap<usize, BTreeMap<usize, String>>,
    pub timestamp: String,
}

/// Participant feedback about one intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackData {
    #[serde(rename = "interventionId")]
    pub intervention_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Client -> server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent once per (re)connect to re-establish backend context.
    SyncState {
        segments: HashMap<Uuid, SegmentSnapshot>,
        #[serde(rename = "analysisStatus")]
        analysis_status: HashMap<Uuid, AnalysisStatus>,
    },
    SessionStart {
        #[serde(rename = "sessionId")]
        session_id: String,
        context: String,
        #[serde(rename = "initiativeMode")]
        initiative_mode: InitiativeMode,
        timestamp: String,
    },
    SegmentUpdate {
        uuid: Uuid,
        text: String,
        #[serde(rename = "questionIdx")]
        question_idx: usize,
        #[serde(rename = "segmentIdx")]
        segment_idx: usize,
        #[serde(rename = "interventionMode")]
        intervention_mode: AnalysisMode,
        #[serde(rename = "isManualTrigger")]
        is_manual_trigger: bool,
        #[serde(rename = "editCount")]
        edit_count: u32,
        /// Full segment map for cross-segment consistency checks.
        all_segments: HashMap<Uuid, SegmentSnapshot>,
    },
    SegmentTiming {
        uuid: Uuid,
        edit_start_time: String,
        edit_end_time: String,
        #[serde(rename = "editDuration")]
        edit_duration: u64,
        #[serde(rename = "questionIdx")]
        question_idx: usize,
        #[serde(rename = "segmentIdx")]
        segment_idx: usize,
        text: String,
    },
    InterventionResponse {
        uuid: Uuid,
        #[serde(rename = "interventionId")]
        intervention_id: String,
        response: InterventionResponse,
        #[serde(rename = "newText")]
        new_text: Option<String>,
        globalmode: DisplayMode,
        mode: DisplayMode,
        #[serde(rename = "appearanceTime")]
        appearance_time: String,
        #[serde(rename = "firstInteractionTime")]
        first_interaction_time: Option<String>,
        #[serde(rename = "responseTime")]
        response_time: String,
        #[serde(rename = "interactionLatency")]
        interaction_latency: Option<u64>,
        #[serde(rename = "responseLatency")]
        response_latency: u64,
        #[serde(rename = "activeInterventionsAtResponse")]
        active_interventions_at_response: ActiveCounts,
    },
    ActivityTimeline {
        #[serde(rename = "interventionId")]
        intervention_id: String,
        timestamp: String,
        data: ActivityTimeline,
    },
    InterventionFeedback {
        #[serde(flatten)]
        feedback: FeedbackData,
    },
    StabilityCheck {
        #[serde(rename = "questionId")]
        question_id: usize,
        timestamp: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    GenerateRequirements {
        #[serde(rename = "questionId")]
        question_id: usize,
        segments: Vec<GenerationSegment>,
        #[serde(rename = "triggerMode")]
        trigger_mode: TriggerMode,
        timestamp: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    DiscardRequirementGeneration {
        #[serde(rename = "questionId")]
        question_id: usize,
        timestamp: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    SubmitSurvey {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "finalState")]
        final_state: FinalState,
    },
    PauseAnalysis,
    ResumeAnalysis,
}

/// Intervention as it arrives on the wire. The id and question index may be
/// absent; the store fills fallbacks on receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(rename = "questionIdx", default)]
    pub question_idx: Option<usize>,
    #[serde(flatten)]
    pub kind: InterventionKind,
}

/// Generated requirement as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub requirement: String,
    #[serde(default)]
    pub segments: Vec<Uuid>,
}

/// Server -> client messages. Unknown `type` tags fail the per-message
/// parse and are logged and dropped by the channel client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AnalysisStatus {
        uuid: Uuid,
        status: AnalysisStatus,
    },
    AnalysisComplete {
        uuid: Uuid,
        #[serde(default)]
        interventions: Vec<InterventionPayload>,
    },
    AnalysisError {
        uuid: Uuid,
        error: String,
    },
    Intervention {
        uuid: Uuid,
        intervention: InterventionPayload,
    },
    StabilityResponse {
        #[serde(rename = "questionId")]
        question_id: usize,
        #[serde(rename = "isStable")]
        is_stable: bool,
    },
    RequirementGenerationComplete {
        #[serde(rename = "questionId")]
        question_id: usize,
        #[serde(default)]
        requirements: Vec<RequirementPayload>,
    },
    RequirementGenerationFailed {
        #[serde(rename = "questionId")]
        question_id: usize,
        error: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
    InterventionFeedbackReceived {
        #[serde(rename = "interventionId", default)]
        intervention_id: Option<String>,
    },
    SurveySubmissionConfirmed {
        #[serde(rename = "sessionId", default)]
        session_id: Option<String>,
    },
}
