use ideaboard_core::{update, Msg, TrackerConfig, TrackerState};

#[test]
fn timers_and_transport_errors_before_start_are_ignored() {
    let state = TrackerState::new("job-1", TrackerConfig::default());
    for msg in [
        Msg::PollDue,
        Msg::RedirectDue,
        Msg::TransportError("connection refused".into()),
    ] {
        let (next, effects) = update(state.clone(), msg);
        assert_eq!(state, next);
        assert!(effects.is_empty());
    }
}

#[test]
fn messages_before_start_are_ignored() {
    let state = TrackerState::new("job-1", TrackerConfig::default());
    let (next, effects) = update(state.clone(), Msg::StreamMessage(r#"{"run_id":"r1"}"#.into()));

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
