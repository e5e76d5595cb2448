/// Reasons the submit gate sequence can refuse to submit, evaluated in
/// order with short-circuit. Each maps to a user-visible status line; none
/// of these ever reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBlock {
    /// First attempt with unresolved interventions: offer a review pass.
    ReviewInterventions { count: usize },
    /// Subsequent attempts: only the explicit bulk action clears these.
    UnresolvedInterventions { count: usize },
    /// Segments still needed generation; a survey-end generation was
    /// triggered for these questions.
    GenerationTriggered { questions: Vec<usize> },
    GenerationPending { questions: Vec<usize> },
    UnratedRequirements { count: usize },
    BaselineNotGenerated,
    BaselineNotRated,
}

impl SubmitBlock {
    pub fn status_line(&self) -> String {
        match self {
            SubmitBlock::ReviewInterventions { count } => format!(
                "You have {} unresolved suggestion(s). Please review them before submitting.",
                count
            ),
            SubmitBlock::UnresolvedInterventions { count } => format!(
                "{} suggestion(s) still unresolved. Dismiss all remaining to submit.",
                count
            ),
            SubmitBlock::GenerationTriggered { questions } => format!(
                "Generating requirements for {} question(s) before submission...",
                questions.len()
            ),
            SubmitBlock::GenerationPending { questions } => format!(
                "Requirement generation still running for {} question(s). Please wait.",
                questions.len()
            ),
            SubmitBlock::UnratedRequirements { count } => {
                format!("{} requirement(s) still need a rating.", count)
            }
            SubmitBlock::BaselineNotGenerated => {
                "Baseline requirements are still being generated.".to_string()
            }
            SubmitBlock::BaselineNotRated => {
                "Please rate the baseline requirements before submitting.".to_string()
            }
        }
    }
}

/// Submission-side session flags.
#[derive(Debug, Default)]
pub struct SubmissionState {
    /// The review prompt is shown once; after that, unresolved
    /// interventions require the bulk action.
    pub review_prompted: bool,
    pub status: String,
    /// Pre/post comparison arm bookkeeping (only consulted when the
    /// feature is enabled).
    pub baseline_generated: bool,
    pub baseline_rated: bool,
}

impl SubmissionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
