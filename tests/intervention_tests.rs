use elicit::channel::protocol::{ClientMessage, InterventionPayload, ServerMessage};
use elicit::config::SessionConfig;
use elicit::kernel::event::{Command, Effect};
use elicit::kernel::intervention::{
    DisplayMode, InterventionKind, InterventionResponse, SegmentRef,
};
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

fn inject(
    s: &mut SurveyStore,
    uuid: Uuid,
    id: &str,
    confidence: f64,
    kind: InterventionKind,
    now_ms: u64,
) {
    s.handle_server(
        ServerMessage::Intervention {
            uuid,
            intervention: InterventionPayload {
                id: Some(id.to_string()),
                confidence: Some(confidence),
                question_idx: None,
                kind,
            },
        },
        now_ms,
    );
}

fn clarification(phrase: &str) -> InterventionKind {
    InterventionKind::AmbiguityClarification {
        trigger_phrase: phrase.to_string(),
    }
}

#[test]
fn test_applying_suggestion_rewrites_and_reanalyzes() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "please add a search bar that works fast".into(),
        },
        100,
    );
    s.apply(Command::FocusSegment { uuid: Some(uuid) }, 150);
    s.apply(Command::FocusSegment { uuid: None }, 200);

    inject(
        &mut s,
        uuid,
        "int-1",
        0.9,
        InterventionKind::AmbiguityMultipleChoice {
            trigger_phrase: "works fast".into(),
            suggestions: vec!["responds within one second".into()],
        },
        1000,
    );

    let effects = s.apply(
        Command::RespondIntervention {
            id: "int-1".into(),
            response: InterventionResponse::Applied,
            new_text: Some("please add a search bar that responds within one second".into()),
            target: None,
        },
        5000,
    );
    let msgs = sends(&effects);

    // Response telemetry, activity timeline, then the fresh analysis.
    assert!(matches!(
        msgs[0],
        ClientMessage::InterventionResponse {
            response: InterventionResponse::Applied,
            ..
        }
    ));
    assert!(matches!(msgs[1], ClientMessage::ActivityTimeline { .. }));
    assert!(
        msgs.iter()
            .any(|m| matches!(m, ClientMessage::SegmentUpdate { .. })),
        "applied text with no other open interventions re-analyzes"
    );

    let seg = s.segments.get(&uuid).map(|x| x.text.clone());
    assert_eq!(
        seg.as_deref(),
        Some("please add a search bar that responds within one second")
    );
    let resolved = s.interventions.get("int-1").and_then(|i| i.response);
    assert_eq!(resolved, Some(InterventionResponse::Applied));
}

#[test]
fn test_reanalysis_waits_for_other_open_interventions() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "the page should load quickly for everyone".into(),
        },
        100,
    );
    s.apply(Command::FocusSegment { uuid: Some(uuid) }, 150);
    s.apply(Command::FocusSegment { uuid: None }, 200);

    inject(&mut s, uuid, "int-1", 0.7, clarification("quickly"), 1000);
    inject(&mut s, uuid, "int-2", 0.7, clarification("everyone"), 1000);

    let effects = s.apply(
        Command::RespondIntervention {
            id: "int-1".into(),
            response: InterventionResponse::Applied,
            new_text: Some("the page should load in under two seconds for everyone".into()),
            target: None,
        },
        2000,
    );
    assert!(
        !sends(&effects)
            .iter()
            .any(|m| matches!(m, ClientMessage::SegmentUpdate { .. })),
        "analysis must wait while another intervention is open on the segment"
    );
}

#[test]
fn test_edit_stales_own_open_interventions() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "exports must be fast enough".into(),
        },
        100,
    );
    inject(&mut s, uuid, "int-1", 0.7, clarification("fast"), 500);

    s.apply(
        Command::SetText {
            uuid,
            text: "exports must complete in ten seconds".into(),
        },
        1000,
    );
    let stale = s.interventions.get("int-1").map(|i| i.is_stale);
    assert_eq!(stale, Some(true), "editing invalidates open interventions");
}

#[test]
fn test_cross_segment_consistency_staleness() {
    let mut s = store();
    let a = s.add_segment(0);
    let b = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid: a,
            text: "all data is stored locally".into(),
        },
        100,
    );
    s.apply(
        Command::SetText {
            uuid: b,
            text: "data syncs to the cloud".into(),
        },
        200,
    );

    inject(
        &mut s,
        b,
        "int-c",
        0.97,
        InterventionKind::Consistency {
            previous_segment: SegmentRef {
                uuid: a,
                text: "all data is stored locally".into(),
            },
            current_segment: SegmentRef {
                uuid: b,
                text: "data syncs to the cloud".into(),
            },
        },
        500,
    );

    // Editing the referenced (other) segment stales the intervention too.
    s.apply(
        Command::SetText {
            uuid: a,
            text: "most data is stored locally".into(),
        },
        1000,
    );
    let stale = s.interventions.get("int-c").map(|i| i.is_stale);
    assert_eq!(stale, Some(true));
}

#[test]
fn test_panel_arbitration_ranks_and_caps() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "the dashboard needs to show relevant data quickly".into(),
        },
        100,
    );

    inject(
        &mut s,
        uuid,
        "i-mc",
        0.85,
        InterventionKind::AmbiguityMultipleChoice {
            trigger_phrase: "relevant".into(),
            suggestions: vec!["last 30 days".into()],
        },
        500,
    );
    inject(&mut s, uuid, "i-a", 0.99, clarification("quickly"), 500);
    inject(
        &mut s,
        uuid,
        "i-z",
        0.96,
        InterventionKind::Consistency {
            previous_segment: SegmentRef {
                uuid,
                text: "x".into(),
            },
            current_segment: SegmentRef {
                uuid,
                text: "y".into(),
            },
        },
        500,
    );
    inject(&mut s, uuid, "i-b", 0.7, clarification("show"), 500);
    inject(&mut s, uuid, "i-low", 0.5, clarification("data"), 500);

    // Multiple-choice outranks higher-confidence clarifications; the cap is
    // three; below-threshold confidence is always inline.
    assert_eq!(s.display_mode_for("i-mc"), Some(DisplayMode::Panel));
    assert_eq!(s.display_mode_for("i-a"), Some(DisplayMode::Panel));
    assert_eq!(s.display_mode_for("i-z"), Some(DisplayMode::Panel));
    assert_eq!(s.display_mode_for("i-b"), Some(DisplayMode::Inline));
    assert_eq!(s.display_mode_for("i-low"), Some(DisplayMode::Inline));

    // Same inputs, same answer: arbitration is deterministic.
    assert_eq!(s.display_mode_for("i-b"), Some(DisplayMode::Inline));

    // Global override wins over ranking.
    s.apply(Command::SetDisplayMode(DisplayMode::Inline), 600);
    assert_eq!(s.display_mode_for("i-mc"), Some(DisplayMode::Inline));
}

#[test]
fn test_stale_inline_auto_dismisses_after_grace() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "notifications should not be annoying".into(),
        },
        100,
    );
    // Below the clarification threshold, so it sits inline.
    inject(&mut s, uuid, "int-1", 0.5, clarification("annoying"), 1000);

    s.apply(
        Command::SetText {
            uuid,
            text: "notifications are limited to one per hour".into(),
        },
        2000,
    );
    assert_eq!(
        s.interventions.get("int-1").map(|i| i.is_stale),
        Some(true)
    );

    let effects = s.tick(3999);
    assert!(sends(&effects).is_empty(), "grace period not yet elapsed");

    let effects = s.tick(4000);
    let msgs = sends(&effects);
    assert!(matches!(
        msgs[0],
        ClientMessage::InterventionResponse {
            response: InterventionResponse::Dismissed,
            ..
        }
    ));
    assert_eq!(
        s.interventions.get("int-1").and_then(|i| i.response),
        Some(InterventionResponse::Dismissed)
    );
}

#[test]
fn test_bulk_dismiss_resolves_each_individually() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "search results should feel instantaneous".into(),
        },
        100,
    );
    inject(&mut s, uuid, "int-1", 0.7, clarification("instantaneous"), 500);
    inject(&mut s, uuid, "int-2", 0.7, clarification("feel"), 500);

    let effects = s.apply(Command::BulkDismiss, 1000);
    let responses = sends(&effects)
        .iter()
        .filter(|m| matches!(m, ClientMessage::InterventionResponse { .. }))
        .count();
    assert_eq!(responses, 2, "each intervention gets its own telemetry");
    assert_eq!(s.interventions.unresolved_nonstale(), 0);
    assert!(s.interventions.iter().all(|i| i.response.is_some()));
}

#[test]
fn test_duplicate_response_is_ignored() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "reports should be exportable somehow".into(),
        },
        100,
    );
    inject(&mut s, uuid, "int-1", 0.7, clarification("somehow"), 500);

    s.apply(
        Command::RespondIntervention {
            id: "int-1".into(),
            response: InterventionResponse::Dismissed,
            new_text: None,
            target: None,
        },
        1000,
    );
    let effects = s.apply(
        Command::RespondIntervention {
            id: "int-1".into(),
            response: InterventionResponse::Applied,
            new_text: None,
            target: None,
        },
        2000,
    );
    assert!(effects.is_empty(), "resolution is terminal");
    assert_eq!(
        s.interventions.get("int-1").and_then(|i| i.response),
        Some(InterventionResponse::Dismissed)
    );
}

#[test]
fn test_response_latencies_reported() {
    let mut s = store();
    let uuid = s.add_segment(0);
    s.apply(
        Command::SetText {
            uuid,
            text: "the app must work offline as well".into(),
        },
        100,
    );
    inject(&mut s, uuid, "int-1", 0.7, clarification("offline"), 1000);

    s.apply(
        Command::InteractIntervention {
            id: "int-1".into(),
        },
        1500,
    );
    let effects = s.apply(
        Command::RespondIntervention {
            id: "int-1".into(),
            response: InterventionResponse::Dismissed,
            new_text: None,
            target: None,
        },
        3000,
    );

    match sends(&effects)[0] {
        ClientMessage::InterventionResponse {
            interaction_latency,
            response_latency,
            active_interventions_at_response,
            ..
        } => {
            assert_eq!(*interaction_latency, Some(500));
            assert_eq!(*response_latency, 2000);
            // Counts are captured before the resolution mutates them.
            assert_eq!(active_interventions_at_response.total, 1);
            assert_eq!(active_interventions_at_response.for_segment, 1);
        }
        other => panic!("expected intervention_response, got {:?}", other),
    }
}
