use uuid::Uuid;

use super::activity::ActivityEvent;
use super::intervention::{DisplayMode, InterventionResponse};
use crate::channel::protocol::{ClientMessage, FeedbackData};

/// Initiative arm of the user study. `Fixed` forces panel display, turns
/// automatic analysis off and suppresses inactivity monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiativeMode {
    Mixed,
    Fixed,
}

/// Everything the UI (or a test) can ask the store to do. The store is the
/// single writer; presentation code only issues commands and reads
/// snapshots.
#[derive(Debug, Clone)]
pub enum Command {
    StartSession {
        session_id: String,
        context: String,
    },
    SetInitiativeMode(InitiativeMode),
    AddSegment {
        question_idx: usize,
    },
    /// Keystroke-level text mutation. Carries the staleness and
    /// requirement-invalidation side effects of an edit.
    SetText {
        uuid: Uuid,
        text: String,
    },
    /// Active-editing-segment switch; `None` is a plain blur. Leaving a
    /// segment is the main analysis dispatch point.
    FocusSegment {
        uuid: Option<Uuid>,
    },
    EditStarted {
        uuid: Uuid,
    },
    EditEnded {
        uuid: Uuid,
    },
    Activity {
        question_idx: Option<usize>,
        event: ActivityEvent,
    },
    PauseTracking,
    ResumeTracking,
    InteractIntervention {
        id: String,
    },
    RespondIntervention {
        id: String,
        response: InterventionResponse,
        new_text: Option<String>,
        /// Explicit target for "edit previous" consistency resolutions.
        target: Option<Uuid>,
    },
    SubmitInterventionFeedback {
        id: String,
        feedback: FeedbackData,
    },
    BulkDismiss,
    SetDisplayMode(DisplayMode),
    ToggleAnalysisMode,
    TriggerManualAnalysis {
        uuid: Uuid,
    },
    GenerateRequirements {
        question_idx: usize,
    },
    ValidateRequirement {
        id: String,
        rating: u8,
    },
    RejectRequirement {
        id: String,
    },
    Submit,
    Reset,
}

/// Side effects a store step wants performed. The store never does I/O;
/// the driver executes these after each step.
#[derive(Debug, Clone)]
pub enum Effect {
    Send(ClientMessage),
    /// Short-lived, user-visible status text.
    Status(String),
    /// The whole session state was cleared (post-confirmation reset).
    SessionReset,
}
