use elicit::channel::protocol::{
    iso_millis, ClientMessage, FeedbackData, InterventionPayload, ServerMessage,
};
use elicit::config::SessionConfig;
use elicit::kernel::activity::{ActivityEvent, ActivityKind};
use elicit::kernel::event::{Command, Effect};
use elicit::kernel::intervention::InterventionKind;
use elicit::SurveyStore;
use uuid::Uuid;

fn store() -> SurveyStore {
    let mut s = SurveyStore::new(SessionConfig::default());
    s.apply(
        Command::StartSession {
            session_id: "s-1".into(),
            context: "test".into(),
        },
        0,
    );
    s
}

fn sends(effects: &[Effect]) -> Vec<&ClientMessage> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send(m) => Some(m),
            _ => None,
        })
        .collect()
}

fn inject(s: &mut SurveyStore, uuid: Uuid, id: &str, now_ms: u64) {
    s.handle_server(
        ServerMessage::Intervention {
            uuid,
            intervention: InterventionPayload {
                id: Some(id.to_string()),
                confidence: Some(0.7),
                question_idx: None,
                kind: InterventionKind::AmbiguityClarification {
                    trigger_phrase: "roughly".into(),
                },
            },
        },
        now_ms,
    );
}

fn typing(at: u64) -> ActivityEvent {
    ActivityEvent {
        kind: ActivityKind::TypingStarted,
        timestamp: at,
        context: None,
    }
}

#[test]
fn test_edit_bracket_reports_segment_timing() {
    let mut s = store();
    let uuid = s.add_segment(2);
    s.apply(
        Command::SetText {
            uuid,
            text: "backups should run roughly every night".into(),
        },
        50,
    );

    s.apply(Command::EditStarted { uuid }, 1000);
    let effects = s.apply(Command::EditEnded { uuid }, 4500);

    match sends(&effects)[0] {
        ClientMessage::SegmentTiming {
            uuid: u,
            edit_start_time,
            edit_end_time,
            edit_duration,
            question_idx,
            segment_idx,
            text,
        } => {
            assert_eq!(*u, uuid);
            assert_eq!(edit_start_time, &iso_millis(1000));
            assert_eq!(edit_end_time, &iso_millis(4500));
            assert_eq!(*edit_duration, 3500);
            assert_eq!(*question_idx, 2);
            assert_eq!(*segment_idx, 0);
            assert_eq!(text, "backups should run roughly every night");
        }
        other => panic!("expected segment_timing, got {:?}", other),
    }
}

#[test]
fn test_edit_end_without_open_bracket_is_silent() {
    let mut s = store();
    let uuid = s.add_segment(0);

    // Never started: nothing to report.
    let effects = s.apply(Command::EditEnded { uuid }, 1000);
    assert!(effects.is_empty());

    // A bracket is consumed by the first end; a duplicate end stays silent.
    s.apply(Command::EditStarted { uuid }, 2000);
    let effects = s.apply(Command::EditEnded { uuid }, 3000);
    assert_eq!(sends(&effects).len(), 1);
    let effects = s.apply(Command::EditEnded { uuid }, 4000);
    assert!(effects.is_empty());
}

#[test]
fn test_intervention_feedback_marks_and_forwards() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "the importer should finish roughly on time".into(),
        },
        100,
    );
    inject(&mut s, uuid, "int-1", 500);

    let effects = s.apply(
        Command::SubmitInterventionFeedback {
            id: "int-1".into(),
            feedback: FeedbackData {
                intervention_id: "int-1".into(),
                rating: Some(4),
                comment: Some("helped me be precise".into()),
            },
        },
        2000,
    );

    assert_eq!(
        s.interventions.get("int-1").map(|i| i.feedback_submitted),
        Some(true)
    );
    assert_eq!(s.feedback_log().len(), 1);

    let v = serde_json::to_value(sends(&effects)[0]).expect("serializes");
    assert_eq!(v["type"], "intervention_feedback");
    assert_eq!(v["interventionId"], "int-1", "feedback fields flatten onto the message");
    assert_eq!(v["rating"], 4);
}

#[test]
fn test_feedback_for_unknown_intervention_still_logged() {
    let mut s = store();
    let effects = s.apply(
        Command::SubmitInterventionFeedback {
            id: "int-gone".into(),
            feedback: FeedbackData {
                intervention_id: "int-gone".into(),
                rating: None,
                comment: None,
            },
        },
        1000,
    );
    // The record and outbound message survive even when the local entry is
    // already gone.
    assert_eq!(s.feedback_log().len(), 1);
    assert!(matches!(
        sends(&effects)[0],
        ClientMessage::InterventionFeedback { .. }
    ));
}

#[test]
fn test_pause_resume_passthrough_and_suppression() {
    let mut s = store();

    let effects = s.apply(Command::PauseTracking, 1000);
    assert!(matches!(sends(&effects)[0], ClientMessage::PauseAnalysis));
    assert!(s.activity.is_paused());

    // Activity while paused is dropped, not buffered.
    s.apply(
        Command::Activity {
            question_idx: None,
            event: typing(1500),
        },
        1500,
    );
    assert!(s.activity.is_empty());

    let effects = s.apply(Command::ResumeTracking, 3000);
    assert!(matches!(sends(&effects)[0], ClientMessage::ResumeAnalysis));
    assert!(!s.activity.is_paused());

    s.apply(
        Command::Activity {
            question_idx: None,
            event: typing(3500),
        },
        3500,
    );
    assert_eq!(s.activity.len(), 1);
}
