use std::sync::Once;
use std::time::Duration;

use ideaboard_core::{
    update, CredentialPolicy, Effect, Link, Msg, Phase, RedirectTarget, TrackerConfig,
    TrackerState, MSG_CONNECTION_LOST, MSG_NOT_SIGNED_IN,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(tracker_logging::initialize_for_tests);
}

fn started(job_id: &str) -> TrackerState {
    let state = TrackerState::new(job_id, TrackerConfig::default());
    let (state, effects) = update(
        state,
        Msg::Start {
            credential: Some("tok".to_string()),
        },
    );
    assert_eq!(effects.len(), 1);
    state
}

fn send(state: TrackerState, raw: &str) -> (TrackerState, Vec<Effect>) {
    update(state, Msg::StreamMessage(raw.to_string()))
}

fn progress_of(state: &TrackerState) -> (Phase, u8) {
    (state.phase(), state.status().progress())
}

#[test]
fn start_opens_exactly_one_stream() {
    init_logging();
    let state = TrackerState::new("job-42", TrackerConfig::default());
    let (state, effects) = update(
        state,
        Msg::Start {
            credential: Some("tok".to_string()),
        },
    );

    match effects.as_slice() {
        [Effect::OpenStream { url }] => {
            assert!(url.starts_with("http://localhost:3000/api/proxy?"));
            assert!(url.contains("path=%2Fthreads%2Fjob-42%2Fruns%2Fstream"));
            assert!(url.contains("authorization=Bearer+tok"));
        }
        other => panic!("unexpected effects: {other:?}"),
    }
    assert_eq!(state.link(), Link::Streaming);
    assert_eq!(state.phase(), Phase::Pending);

    let (state, effects) = update(
        state,
        Msg::Start {
            credential: Some("tok".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.link(), Link::Streaming);
}

#[test]
fn run_marker_then_personas_completes_and_redirects() {
    init_logging();
    let state = started("job-42");

    let (state, _) = send(state, r#"{"run_id":"r1"}"#);
    assert_eq!(progress_of(&state), (Phase::Generating, 10));

    let raw = r#"{"persona":[{"name":"A"}]}"#;
    let (state, effects) = send(state, raw);
    assert_eq!(progress_of(&state), (Phase::Completed, 100));
    assert_eq!(
        effects,
        vec![
            Effect::PersistResult {
                key: "idea_result_job-42".to_string(),
                payload: raw.to_string(),
            },
            Effect::ClearActiveJob,
            Effect::StatusChanged(state.status().clone()),
            Effect::ScheduleRedirect {
                delay: Duration::from_millis(1500),
            },
        ]
    );
    assert!(!state.is_settled());

    let (state, effects) = update(state, Msg::RedirectDue);
    assert_eq!(
        effects,
        vec![
            Effect::CloseConnection,
            Effect::Navigate {
                route: "/ideas/job-42/analytics".to_string(),
            },
        ]
    );
    assert!(state.is_settled());

    let (_, effects) = update(state, Msg::RedirectDue);
    assert!(effects.is_empty());
}

#[test]
fn detail_redirect_target_is_configurable() {
    init_logging();
    let config = TrackerConfig {
        redirect: RedirectTarget::Detail,
        ..TrackerConfig::default()
    };
    let (state, _) = update(
        TrackerState::new("job-42", config),
        Msg::Start {
            credential: Some("tok".to_string()),
        },
    );
    let (state, _) = send(state, r#"{"personas":[{"name":"A"}]}"#);
    let (_, effects) = update(state, Msg::RedirectDue);
    assert!(effects.contains(&Effect::Navigate {
        route: "/ideas/job-42".to_string()
    }));
}

#[test]
fn personas_complete_from_pending_too() {
    init_logging();
    let state = started("job-7");
    let (state, effects) = send(state, r#"{"persona":[{"name":"A"},{"name":"B"}]}"#);

    assert_eq!(progress_of(&state), (Phase::Completed, 100));
    let persists = effects
        .iter()
        .filter(|effect| matches!(effect, Effect::PersistResult { .. }))
        .count();
    let redirects = effects
        .iter()
        .filter(|effect| matches!(effect, Effect::ScheduleRedirect { .. }))
        .count();
    assert_eq!((persists, redirects), (1, 1));

    // A duplicate terminal payload writes and schedules nothing further.
    let (state, effects) = send(state, r#"{"persona":[{"name":"A"}]}"#);
    assert!(effects.is_empty());
    assert_eq!(progress_of(&state), (Phase::Completed, 100));
}

#[test]
fn ticks_climb_by_step_and_hold_at_cap() {
    init_logging();
    let (mut state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let mut seen = vec![state.status().progress()];
    for _ in 0..9 {
        let (next, _) = send(state, r#"{"values":{"generated_count":1}}"#);
        state = next;
        assert_eq!(state.phase(), Phase::Generating);
        seen.push(state.status().progress());
    }

    assert_eq!(seen, vec![10, 20, 30, 40, 50, 60, 70, 80, 80, 80]);
}

#[test]
fn completed_marker_without_personas_is_finalizing() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let (state, _) = send(state, r#"{"status":"completed"}"#);
    assert_eq!(progress_of(&state), (Phase::Generating, 90));

    // Further ticks never pull progress back under the finalizing level.
    let (state, effects) = send(state, r#"{"status":"running"}"#);
    assert_eq!(progress_of(&state), (Phase::Generating, 90));
    assert!(effects.is_empty() || matches!(effects.as_slice(), [Effect::StatusChanged(_)]));
}

#[test]
fn empty_persona_echo_is_not_terminal() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let (state, effects) = send(state, r#"{"persona":[],"status":"pending"}"#);

    assert_eq!(progress_of(&state), (Phase::Generating, 20));
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::PersistResult { .. })));
}

#[test]
fn malformed_message_is_swallowed_while_generating() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let (state, effects) = send(state, "not json {");

    assert!(effects.is_empty());
    assert_eq!(progress_of(&state), (Phase::Generating, 10));
    assert_eq!(state.link(), Link::Streaming);
}

#[test]
fn malformed_message_fails_when_not_generating() {
    init_logging();
    let (state, effects) = send(started("job-1"), "ping");

    assert_eq!(progress_of(&state), (Phase::Failed, 0));
    assert_eq!(effects[0], Effect::CloseConnection);
    assert!(state.is_settled());
}

#[test]
fn transport_error_fails_and_closes() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let (state, effects) = update(state, Msg::TransportError("reset".into()));

    assert_eq!(progress_of(&state), (Phase::Failed, 0));
    assert_eq!(state.status().message(), MSG_CONNECTION_LOST);
    assert_eq!(effects[0], Effect::CloseConnection);
    assert_eq!(state.link(), Link::Closed);

    // Once failed, late messages change nothing.
    let (state, effects) = send(state, r#"{"persona":[{"name":"A"}]}"#);
    assert!(effects.is_empty());
    assert_eq!(progress_of(&state), (Phase::Failed, 0));
}

#[test]
fn transport_error_after_completion_is_ignored() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"persona":[{"name":"A"}]}"#);
    let before = state.clone();
    let (state, effects) = update(state, Msg::TransportError("closed".into()));

    assert!(effects.is_empty());
    assert_eq!(state, before);

    // Navigation still happens after the suppressed error.
    let (_, effects) = update(state, Msg::RedirectDue);
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, Effect::Navigate { .. })));
}

#[test]
fn missing_credential_can_stay_pending() {
    init_logging();
    let config = TrackerConfig {
        credential_policy: CredentialPolicy::StayPending,
        ..TrackerConfig::default()
    };
    let (state, effects) = update(
        TrackerState::new("job-1", config),
        Msg::Start { credential: None },
    );

    assert!(effects.is_empty());
    assert_eq!(progress_of(&state), (Phase::Pending, 0));
    assert_eq!(state.link(), Link::Idle);
    assert!(state.is_settled());
}

#[test]
fn missing_credential_can_fail_fast() {
    init_logging();
    let config = TrackerConfig {
        credential_policy: CredentialPolicy::FailFast,
        ..TrackerConfig::default()
    };
    let (state, effects) = update(
        TrackerState::new("job-1", config),
        Msg::Start {
            credential: Some("   ".to_string()),
        },
    );

    assert_eq!(effects, vec![Effect::StatusChanged(state.status().clone())]);
    assert_eq!(progress_of(&state), (Phase::Failed, 0));
    assert_eq!(state.status().message(), MSG_NOT_SIGNED_IN);
    assert_eq!(state.link(), Link::Closed);
}

#[test]
fn teardown_closes_and_blocks_everything_after() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"run_id":"r1"}"#);
    let (state, effects) = update(state, Msg::Teardown);
    assert_eq!(effects, vec![Effect::CloseConnection]);
    assert!(state.is_settled());

    let before = state.clone();
    let (state, effects) = send(state, r#"{"persona":[{"name":"A"}]}"#);
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::TransportError("gone".into()));
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn teardown_during_redirect_delay_skips_navigation() {
    init_logging();
    let (state, _) = send(started("job-1"), r#"{"persona":[{"name":"A"}]}"#);
    let (state, effects) = update(state, Msg::Teardown);
    assert_eq!(effects, vec![Effect::CloseConnection]);

    let (_, effects) = update(state, Msg::RedirectDue);
    assert!(effects.is_empty());
}
