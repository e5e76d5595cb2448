use tracing::{debug, warn};
use uuid::Uuid;

use super::activity::ActivityRecorder;
use super::analysis::{AnalysisCoordinator, AnalysisMode, AnalysisStatus};
use super::event::{Command, Effect, InitiativeMode};
use super::intervention::{
    DisplayMode, Intervention, InterventionResponse, InterventionSet,
};
use super::requirement::{Requirement, RequirementBook, SegmentRequirementState};
use super::scheduler::{GenerationError, InactivityScheduler, TimerFire, TriggerMode};
use super::segment::SegmentStore;
use super::submission::{SubmissionState, SubmitBlock};
use crate::channel::protocol::{
    iso_millis, ClientMessage, FeedbackData, FinalState, GenerationSegment, InterventionPayload,
    ServerMessage,
};
use crate::config::SessionConfig;

/// The session state machine and event-coordination engine. Single writer:
/// every mutation funnels through `apply`, `handle_server` or `tick`, each a
/// pure synchronous step returning the side effects the driver must run.
/// Time is injected so timing contracts hold under test without sleeping.
pub struct SurveyStore {
    pub config: SessionConfig,
    session_id: Option<String>,
    started: bool,
    initiative: InitiativeMode,
    display_mode: DisplayMode,
    pub segments: SegmentStore,
    pub analysis: AnalysisCoordinator,
    pub interventions: InterventionSet,
    pub requirements: RequirementBook,
    pub scheduler: InactivityScheduler,
    pub activity: ActivityRecorder,
    pub submission: SubmissionState,
    feedback_log: Vec<FeedbackData>,
}

impl SurveyStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            analysis: AnalysisCoordinator::new(config.min_analyze_len),
            scheduler: InactivityScheduler::new(
                config.soft_inactivity_ms,
                config.hard_inactivity_ms,
            ),
            activity: ActivityRecorder::new(config.activity_window_ms, config.timeline_target_ms),
            segments: SegmentStore::new(),
            interventions: InterventionSet::new(),
            requirements: RequirementBook::new(),
            submission: SubmissionState::default(),
            feedback_log: Vec::new(),
            session_id: None,
            started: false,
            initiative: InitiativeMode::Mixed,
            display_mode: DisplayMode::Default,
            config,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn initiative(&self) -> InitiativeMode {
        self.initiative
    }

    pub fn global_display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn feedback_log(&self) -> &[FeedbackData] {
        &self.feedback_log
    }

    /// Resolved placement for one intervention under current state.
    pub fn display_mode_for(&self, id: &str) -> Option<DisplayMode> {
        self.interventions
            .display_mode(id, self.display_mode, self.config.max_panel_count)
    }

    pub fn add_segment(&mut self, question_idx: usize) -> Uuid {
        self.segments.add(question_idx)
    }

    /// `sync_state` snapshot sent after every (re)connect.
    pub fn sync_message(&self) -> ClientMessage {
        ClientMessage::SyncState {
            segments: self.segments.snapshot_map(),
            analysis_status: self.analysis.status_map().clone(),
        }
    }

    // ---- command entry point ----

    pub fn apply(&mut self, command: Command, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match command {
            Command::StartSession {
                session_id,
                context,
            } => {
                self.session_id = Some(session_id.clone());
                self.started = true;
                effects.push(Effect::Send(ClientMessage::SessionStart {
                    session_id,
                    context,
                    initiative_mode: self.initiative,
                    timestamp: iso_millis(now_ms),
                }));
            }
            Command::SetInitiativeMode(mode) => {
                self.initiative = mode;
                match mode {
                    InitiativeMode::Fixed => {
                        self.display_mode = DisplayMode::Panel;
                        self.analysis.mode = AnalysisMode::Off;
                    }
                    InitiativeMode::Mixed => {
                        self.display_mode = DisplayMode::Default;
                        self.analysis.mode = AnalysisMode::On;
                    }
                }
            }
            Command::AddSegment { question_idx } => {
                self.add_segment(question_idx);
            }
            Command::SetText { uuid, text } => {
                let Some(seg) = self.segments.get_mut(&uuid) else {
                    warn!(%uuid, "set_text on unknown segment");
                    return effects;
                };
                if seg.text == text {
                    return effects;
                }
                seg.text = text;
                self.edit_side_effects(uuid, now_ms, &mut effects);
            }
            Command::FocusSegment { uuid } => {
                let prev = self.segments.set_active_editing(uuid);
                if let Some(prev) = prev {
                    if Some(prev) != uuid {
                        self.dispatch_analysis(prev, false, now_ms, &mut effects);
                    }
                }
            }
            Command::EditStarted { uuid } => {
                if let Some(seg) = self.segments.get_mut(&uuid) {
                    seg.edit_start_ms = Some(now_ms);
                }
            }
            Command::EditEnded { uuid } => {
                if let Some(seg) = self.segments.get_mut(&uuid) {
                    if let Some(start) = seg.edit_start_ms.take() {
                        effects.push(Effect::Send(ClientMessage::SegmentTiming {
                            uuid,
                            edit_start_time: iso_millis(start),
                            edit_end_time: iso_millis(now_ms),
                            edit_duration: now_ms.saturating_sub(start),
                            question_idx: seg.question_idx,
                            segment_idx: seg.segment_idx,
                            text: seg.text.clone(),
                        }));
                    }
                }
            }
            Command::Activity {
                question_idx,
                event,
            } => {
                self.activity.record(event, now_ms);
                if let Some(q) = question_idx {
                    self.touch_question(q, now_ms, &mut effects);
                }
            }
            Command::PauseTracking => {
                self.activity.pause(now_ms);
                effects.push(Effect::Send(ClientMessage::PauseAnalysis));
            }
            Command::ResumeTracking => {
                self.activity.resume(now_ms);
                effects.push(Effect::Send(ClientMessage::ResumeAnalysis));
            }
            Command::InteractIntervention { id } => {
                let question = match self.interventions.get_mut(&id) {
                    Some(int) => {
                        if int.first_interaction_ms.is_none() {
                            int.first_interaction_ms = Some(now_ms);
                        }
                        Some(int.question_idx)
                    }
                    None => {
                        warn!(id, "interaction on unknown intervention");
                        None
                    }
                };
                if let Some(q) = question {
                    self.touch_question(q, now_ms, &mut effects);
                }
            }
            Command::RespondIntervention {
                id,
                response,
                new_text,
                target,
            } => {
                self.respond_intervention(&id, response, new_text, target, now_ms, &mut effects);
            }
            Command::SubmitInterventionFeedback { id, feedback } => {
                match self.interventions.get_mut(&id) {
                    Some(int) => int.feedback_submitted = true,
                    None => warn!(id, "feedback for unknown intervention"),
                }
                self.feedback_log.push(feedback.clone());
                effects.push(Effect::Send(ClientMessage::InterventionFeedback { feedback }));
            }
            Command::BulkDismiss => {
                for id in self.interventions.active_ids() {
                    self.respond_intervention(
                        &id,
                        InterventionResponse::Dismiss,
                        None,
                        None,
                        now_ms,
                        &mut effects,
                    );
                }
            }
            Command::SetDisplayMode(mode) => {
                self.display_mode = mode;
            }
            Command::ToggleAnalysisMode => {
                // Locked in the fixed study arm.
                if self.initiative == InitiativeMode::Fixed {
                    debug!("analysis mode toggle ignored in fixed initiative mode");
                } else {
                    self.analysis.mode = self.analysis.mode.toggled();
                }
            }
            Command::TriggerManualAnalysis { uuid } => {
                self.dispatch_analysis(uuid, true, now_ms, &mut effects);
            }
            Command::GenerateRequirements { question_idx } => {
                self.generate(question_idx, TriggerMode::Manual, now_ms, &mut effects);
            }
            Command::ValidateRequirement { id, rating } => {
                if let Err(e) = self.requirements.validate(&id, rating) {
                    warn!(id, error = %e, "requirement validation rejected");
                    effects.push(Effect::Status(e.to_string()));
                }
            }
            Command::RejectRequirement { id } => {
                match self.requirements.reject(&id) {
                    Ok(segments) => {
                        debug!(id, reset = segments.len(), "requirement rejected");
                    }
                    Err(e) => {
                        warn!(id, error = %e, "requirement rejection rejected");
                        effects.push(Effect::Status(e.to_string()));
                    }
                }
            }
            Command::Submit => {
                self.submit(now_ms, &mut effects);
            }
            Command::Reset => {
                self.reset_session();
                effects.push(Effect::SessionReset);
            }
        }
        effects
    }

    // ---- inbound channel messages ----

    pub fn handle_server(&mut self, message: ServerMessage, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match message {
            ServerMessage::AnalysisStatus { uuid, status } => {
                self.analysis.set_status(uuid, status);
            }
            ServerMessage::AnalysisComplete {
                uuid,
                interventions,
            } => {
                for payload in interventions {
                    self.add_intervention(uuid, payload, now_ms);
                }
                self.analysis.set_status(uuid, AnalysisStatus::Completed);
            }
            ServerMessage::AnalysisError { uuid, error } => {
                warn!(%uuid, error, "segment analysis failed");
                self.analysis.set_status(uuid, AnalysisStatus::Error);
            }
            ServerMessage::Intervention { uuid, intervention } => {
                self.add_intervention(uuid, intervention, now_ms);
            }
            ServerMessage::StabilityResponse {
                question_id,
                is_stable,
            } => {
                if !is_stable {
                    // Not settled yet; keep monitoring.
                    return effects;
                }
                // Guard against the reset race: the verdict only counts if
                // the soft window has genuinely elapsed since last activity.
                if self.scheduler.is_monitoring(question_id)
                    && self.scheduler.stability_window_elapsed(question_id, now_ms)
                {
                    self.generate(question_id, TriggerMode::Stability, now_ms, &mut effects);
                } else {
                    debug!(question_id, "ignoring stability response after timer reset");
                }
            }
            ServerMessage::RequirementGenerationComplete {
                question_id,
                requirements,
            } => {
                if !self.scheduler.is_pending(question_id) {
                    debug!(question_id, "dropping generation result with no pending request");
                    return effects;
                }
                for uuid in self.segments.ids_for_question(question_id) {
                    if self.requirements.segment_state(&uuid)
                        == SegmentRequirementState::Generating
                    {
                        self.requirements
                            .set_segment_state(uuid, SegmentRequirementState::NoNeedGeneration);
                    }
                }
                for payload in requirements {
                    let id = payload
                        .id
                        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()));
                    self.requirements.append(Requirement {
                        id,
                        text: payload.requirement,
                        segments: payload.segments,
                        question_idx: question_id,
                    });
                }
                self.scheduler.clear_pending(question_id);
                self.scheduler.clear_error(question_id);
                self.scheduler.stop(question_id);
            }
            ServerMessage::RequirementGenerationFailed {
                question_id,
                error,
                details,
            } => {
                if !self.scheduler.is_pending(question_id) {
                    debug!(question_id, "dropping generation failure with no pending request");
                    return effects;
                }
                warn!(question_id, error, "requirement generation failed");
                for uuid in self.segments.ids_for_question(question_id) {
                    if self.requirements.segment_state(&uuid)
                        == SegmentRequirementState::Generating
                    {
                        self.requirements
                            .set_segment_state(uuid, SegmentRequirementState::NeedsGeneration);
                    }
                }
                self.scheduler.record_error(
                    question_id,
                    GenerationError {
                        error,
                        details,
                        timestamp: now_ms,
                    },
                );
                self.scheduler.clear_pending(question_id);
                self.scheduler.stop(question_id);
            }
            ServerMessage::InterventionFeedbackReceived { intervention_id } => {
                debug!(?intervention_id, "feedback acknowledged");
            }
            ServerMessage::SurveySubmissionConfirmed { .. } => {
                effects.push(Effect::Status(
                    "Survey data successfully logged! Resetting session...".to_string(),
                ));
                self.reset_session();
                effects.push(Effect::SessionReset);
            }
        }
        effects
    }

    // ---- timer cadence ----

    /// Fires due deadlines: soft fires become stability checks, hard fires
    /// force generation, and overdue stale inline interventions dismiss
    /// themselves.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        for fire in self.scheduler.tick(now_ms) {
            match fire {
                TimerFire::Soft(q) => {
                    debug!(question_idx = q, "soft inactivity timeout");
                    effects.push(Effect::Send(ClientMessage::StabilityCheck {
                        question_id: q,
                        timestamp: iso_millis(now_ms),
                        session_id: self.session_id.clone(),
                    }));
                }
                TimerFire::Hard(q) => {
                    debug!(question_idx = q, "hard inactivity timeout");
                    self.generate(q, TriggerMode::Timeout, now_ms, &mut effects);
                }
            }
        }
        for id in self.interventions.due_for_dismiss(now_ms) {
            debug!(id, "auto-dismissing stale intervention");
            self.respond_intervention(
                &id,
                InterventionResponse::Dismissed,
                None,
                None,
                now_ms,
                &mut effects,
            );
        }
        effects
    }

    // ---- internals ----

    fn add_intervention(&mut self, uuid: Uuid, payload: InterventionPayload, now_ms: u64) {
        let question_idx = payload
            .question_idx
            .or_else(|| self.segments.get(&uuid).map(|s| s.question_idx))
            .unwrap_or(0);
        let id = payload
            .id
            .unwrap_or_else(|| format!("int-{}", Uuid::new_v4()));
        self.interventions.push(Intervention {
            id,
            segment: uuid,
            question_idx,
            kind: payload.kind,
            confidence: payload.confidence,
            response: None,
            appearance_ms: now_ms,
            first_interaction_ms: None,
            response_ms: None,
            is_stale: false,
            feedback_submitted: false,
            dismiss_deadline_ms: None,
        });
        // Newly arriving interventions re-open placement arbitration, but
        // only in the mixed arm; the fixed arm pins the panel.
        if self.initiative == InitiativeMode::Mixed {
            self.display_mode = DisplayMode::Default;
        }
    }

    /// Everything an edit drags along: staleness propagation, requirement
    /// invalidation, inactivity-timer reset, mid-generation discard.
    fn edit_side_effects(&mut self, uuid: Uuid, now_ms: u64, effects: &mut Vec<Effect>) {
        let Some(question_idx) = self.segments.get(&uuid).map(|s| s.question_idx) else {
            return;
        };
        let was_covered = self.requirements.segment_state(&uuid)
            == SegmentRequirementState::NoNeedGeneration;

        let mut staled = self.interventions.mark_all_stale(&uuid);
        staled.extend(self.interventions.mark_consistency_stale(&uuid));
        self.arm_stale_dismissals(&staled, now_ms);

        if was_covered {
            let cascade = self.requirements.mark_segment_dirty(uuid);
            debug!(
                %uuid,
                staled = cascade.staled_requirements.len(),
                reset = cascade.segments_reset.len(),
                "edit invalidated downstream requirements"
            );
            if self.initiative == InitiativeMode::Mixed {
                self.scheduler.ensure_monitoring(question_idx, now_ms);
            }
        }

        self.touch_question(question_idx, now_ms, effects);
    }

    /// A stale intervention sitting inline gets a dismissal deadline; panel
    /// placement keeps it visible until the user resolves it.
    fn arm_stale_dismissals(&mut self, ids: &[String], now_ms: u64) {
        let grace = self.config.stale_dismiss_ms;
        for id in ids {
            let inline = self.display_mode_for(id) == Some(DisplayMode::Inline);
            if let Some(int) = self.interventions.get_mut(id) {
                if inline && int.dismiss_deadline_ms.is_none() {
                    int.dismiss_deadline_ms = Some(now_ms + grace);
                }
            }
        }
    }

    /// Activity on a monitored question resets its timers; if a generation
    /// request is in flight the result is discarded first.
    fn touch_question(&mut self, question_idx: usize, now_ms: u64, effects: &mut Vec<Effect>) {
        if !self.scheduler.is_monitoring(question_idx) {
            return;
        }
        if self.scheduler.is_pending(question_idx) {
            debug!(question_idx, "edit during generation; discarding in-flight result");
            for uuid in self.segments.ids_for_question(question_idx) {
                if self.requirements.segment_state(&uuid) == SegmentRequirementState::Generating {
                    self.requirements
                        .set_segment_state(uuid, SegmentRequirementState::NeedsGeneration);
                }
            }
            self.scheduler.clear_pending(question_idx);
            effects.push(Effect::Send(ClientMessage::DiscardRequirementGeneration {
                question_id: question_idx,
                timestamp: iso_millis(now_ms),
                session_id: self.session_id.clone(),
            }));
        }
        self.scheduler.record_activity(question_idx, now_ms);
    }

    /// The single analysis dispatch point. Applies the debounce rule, the
    /// auto/manual gate, and all dispatch bookkeeping.
    fn dispatch_analysis(
        &mut self,
        uuid: Uuid,
        is_manual: bool,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> bool {
        if self.analysis.mode == AnalysisMode::Off && !is_manual {
            return false;
        }
        let Some(seg) = self.segments.get_mut(&uuid) else {
            warn!(%uuid, "analysis requested for unknown segment");
            return false;
        };
        let text = seg.text.clone();
        if !self
            .analysis
            .should_dispatch(&text, seg.last_analyzed_text.as_deref())
        {
            return false;
        }
        let question_idx = seg.question_idx;
        let segment_idx = seg.segment_idx;
        seg.edit_count += 1;
        seg.last_analyzed_text = Some(text.clone());
        let edit_count = seg.edit_count;

        self.analysis.set_status(uuid, AnalysisStatus::Pending);

        if !is_manual
            && self.initiative == InitiativeMode::Mixed
            && self.question_has_needs_generation(question_idx)
        {
            self.scheduler.ensure_monitoring(question_idx, now_ms);
        }

        effects.push(Effect::Send(ClientMessage::SegmentUpdate {
            uuid,
            text,
            question_idx,
            segment_idx,
            intervention_mode: self.analysis.mode,
            is_manual_trigger: is_manual,
            edit_count,
            all_segments: self.segments.snapshot_map(),
        }));
        true
    }

    fn question_has_needs_generation(&self, question_idx: usize) -> bool {
        self.segments
            .ids_for_question(question_idx)
            .iter()
            .any(|u| {
                self.requirements.segment_state(u) == SegmentRequirementState::NeedsGeneration
            })
    }

    /// Segments worth generating from: needs-generation with actual text.
    fn generation_candidates(&self, question_idx: usize) -> Vec<GenerationSegment> {
        let mut out: Vec<GenerationSegment> = self
            .segments
            .iter()
            .filter(|(u, s)| {
                s.question_idx == question_idx
                    && !s.text.trim().is_empty()
                    && self.requirements.segment_state(u)
                        == SegmentRequirementState::NeedsGeneration
            })
            .map(|(u, s)| GenerationSegment {
                uuid: *u,
                text: s.text.clone(),
            })
            .collect();
        out.sort_by_key(|g| g.uuid);
        out
    }

    fn generate(
        &mut self,
        question_idx: usize,
        trigger: TriggerMode,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        if self.scheduler.is_pending(question_idx) {
            debug!(question_idx, "generation already pending; skipping");
            return;
        }
        let candidates = self.generation_candidates(question_idx);
        if candidates.is_empty() {
            debug!(question_idx, "no segments need generation; skipping");
            return;
        }
        debug!(question_idx, ?trigger, count = candidates.len(), "generating requirements");
        for seg in &candidates {
            self.requirements
                .set_segment_state(seg.uuid, SegmentRequirementState::Generating);
        }
        self.scheduler.clear_deadlines(question_idx);
        self.scheduler.set_pending(question_idx);
        effects.push(Effect::Send(ClientMessage::GenerateRequirements {
            question_id: question_idx,
            segments: candidates,
            trigger_mode: trigger,
            timestamp: iso_millis(now_ms),
            session_id: self.session_id.clone(),
        }));
    }

    fn respond_intervention(
        &mut self,
        id: &str,
        response: InterventionResponse,
        new_text: Option<String>,
        target: Option<Uuid>,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        // Telemetry context is captured before the resolution mutates
        // arbitration inputs.
        let mode = self.display_mode_for(id);
        let Some(int) = self.interventions.get(id) else {
            warn!(id, "response to unknown intervention");
            return;
        };
        if int.response.is_some() {
            debug!(id, "intervention already resolved; ignoring response");
            return;
        }
        let segment = int.segment;
        let appearance = int.appearance_ms;
        let first_interaction = int.first_interaction_ms;
        let counts = self.interventions.active_counts(Some(segment));

        if let Some(int) = self.interventions.get_mut(id) {
            int.response = Some(response);
            int.response_ms = Some(now_ms);
        }

        effects.push(Effect::Send(ClientMessage::InterventionResponse {
            uuid: segment,
            intervention_id: id.to_string(),
            response,
            new_text: new_text.clone(),
            globalmode: self.display_mode,
            mode: mode.unwrap_or(DisplayMode::Inline),
            appearance_time: iso_millis(appearance),
            first_interaction_time: first_interaction.map(iso_millis),
            response_time: iso_millis(now_ms),
            interaction_latency: first_interaction.map(|f| f.saturating_sub(appearance)),
            response_latency: now_ms.saturating_sub(appearance),
            active_interventions_at_response: counts,
        }));
        effects.push(Effect::Send(ClientMessage::ActivityTimeline {
            intervention_id: id.to_string(),
            timestamp: iso_millis(now_ms),
            data: self.activity.timeline(now_ms),
        }));

        let Some(text) = new_text else { return };

        // "Edit previous" consistency resolutions name an explicit target;
        // everything else writes back to the intervention's own segment.
        let target_uuid = target.unwrap_or(segment);
        match self.segments.get_mut(&target_uuid) {
            Some(seg) => {
                if seg.text != text {
                    seg.text = text;
                }
            }
            None => {
                warn!(%target_uuid, "applied text targets unknown segment");
                return;
            }
        }
        self.edit_side_effects(target_uuid, now_ms, effects);

        // Fresh analysis only once the segment has no other unresolved
        // interventions; otherwise resolving them first would race.
        if self.interventions.open_on_segment(&target_uuid) == 0 {
            self.dispatch_analysis(target_uuid, false, now_ms, effects);
        }
    }

    /// Submission gate sequence, evaluated in order with short-circuit.
    fn submit(&mut self, now_ms: u64, effects: &mut Vec<Effect>) {
        let unresolved = self.interventions.unresolved_nonstale();
        if unresolved > 0 {
            let block = if !self.submission.review_prompted {
                self.submission.review_prompted = true;
                SubmitBlock::ReviewInterventions { count: unresolved }
            } else {
                SubmitBlock::UnresolvedInterventions { count: unresolved }
            };
            self.set_status(block.status_line(), effects);
            return;
        }

        let needing: Vec<usize> = self
            .segments
            .question_indices()
            .into_iter()
            .filter(|q| !self.generation_candidates(*q).is_empty())
            .collect();
        if !needing.is_empty() {
            for q in &needing {
                self.generate(*q, TriggerMode::SurveyEnd, now_ms, effects);
            }
            let block = SubmitBlock::GenerationTriggered { questions: needing };
            self.set_status(block.status_line(), effects);
            return;
        }

        if self.scheduler.any_pending() {
            let block = SubmitBlock::GenerationPending {
                questions: self.scheduler.pending_questions(),
            };
            self.set_status(block.status_line(), effects);
            return;
        }

        let unrated = self.requirements.pending_count();
        if unrated > 0 {
            let block = SubmitBlock::UnratedRequirements { count: unrated };
            self.set_status(block.status_line(), effects);
            return;
        }

        if self.config.baseline_enabled {
            if !self.submission.baseline_generated {
                self.set_status(SubmitBlock::BaselineNotGenerated.status_line(), effects);
                return;
            }
            if !self.submission.baseline_rated {
                self.set_status(SubmitBlock::BaselineNotRated.status_line(), effects);
                return;
            }
        }

        let Some(session_id) = self.session_id.clone() else {
            self.set_status("No active session.".to_string(), effects);
            return;
        };
        effects.push(Effect::Send(ClientMessage::SubmitSurvey {
            session_id,
            final_state: FinalState {
                answers: self.segments.answers(),
                timestamp: iso_millis(now_ms),
            },
        }));
        self.set_status("Submitting survey...".to_string(), effects);
    }

    fn set_status(&mut self, status: String, effects: &mut Vec<Effect>) {
        self.submission.status = status.clone();
        effects.push(Effect::Status(status));
    }

    /// Clears every session aggregate atomically. Initiative and display
    /// modes survive; they are study configuration, not session state.
    fn reset_session(&mut self) {
        self.session_id = None;
        self.started = false;
        self.segments.clear();
        self.analysis.clear();
        self.interventions.clear();
        self.requirements.clear();
        self.scheduler.clear();
        self.activity.clear();
        self.submission.reset();
        self.feedback_log.clear();
    }
}
