use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::classify::{classify_poll_response, classify_stream_message, Inbound};
use crate::state::{Link, Redirect};
use crate::status::{MSG_CONNECTION_LOST, MSG_INCOMPLETE, MSG_MALFORMED, MSG_NOT_SIGNED_IN, MSG_TIMED_OUT};
use crate::{result_key, CredentialPolicy, Effect, Msg, Phase, RetryPolicy, TrackerState, Transport};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    // Teardown is final: nothing is accepted afterwards.
    if state.is_torn_down() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Start { credential } => start(&mut state, credential),
        Msg::StreamMessage(raw) => on_stream_message(&mut state, raw),
        Msg::PollResponse(raw) => on_poll_response(&mut state, raw),
        Msg::TransportError(reason) => on_transport_error(&mut state, &reason),
        Msg::PollDue => on_poll_due(&mut state),
        Msg::RedirectDue => on_redirect_due(&mut state),
        Msg::Teardown => {
            let close = state.link().is_active();
            state.tear_down();
            tracker_debug!("Tracker for {} torn down", state.job_id());
            if close {
                vec![Effect::CloseConnection]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn start(state: &mut TrackerState, credential: Option<String>) -> Vec<Effect> {
    if state.is_started() {
        return Vec::new();
    }
    state.mark_started();

    if state.job_id().trim().is_empty() {
        return fail(state, "Missing job id", false);
    }

    let token = match credential.filter(|token| !token.trim().is_empty()) {
        Some(token) => token,
        None => {
            return match state.config().credential_policy {
                CredentialPolicy::StayPending => {
                    tracker_warn!("No credential for job {}; not connecting", state.job_id());
                    Vec::new()
                }
                CredentialPolicy::FailFast => fail(state, MSG_NOT_SIGNED_IN, false),
            };
        }
    };

    match state.invoke_request() {
        Some(request) => {
            state.set_link(Link::Invoking);
            vec![Effect::Invoke { request }]
        }
        None => match state.config().stream_url(state.job_id(), &token) {
            Ok(url) => {
                state.set_link(Link::Streaming);
                vec![Effect::OpenStream { url: url.into() }]
            }
            Err(err) => fail(state, format!("Invalid proxy URL: {err}"), false),
        },
    }
}

fn on_stream_message(state: &mut TrackerState, raw: String) -> Vec<Effect> {
    if state.link() != Link::Streaming || state.status().is_terminal() {
        return Vec::new();
    }
    let steps = state.config().progress;
    match classify_stream_message(&raw) {
        Inbound::Personas(personas) => {
            tracker_info!("Job {} produced {} personas", state.job_id(), personas.len());
            succeed(state, raw)
        }
        Inbound::RunStarted => changed(state, |status| status.begin_generating(steps.watermark)),
        Inbound::Finalizing => changed(state, |status| status.finalizing(steps.finalizing)),
        Inbound::Progress => changed(state, |status| status.tick(steps.step, steps.cap)),
        Inbound::Malformed => on_malformed(state, &raw),
    }
}

fn on_poll_response(state: &mut TrackerState, raw: String) -> Vec<Effect> {
    if state.link() != Link::Invoking || state.status().is_terminal() {
        return Vec::new();
    }
    state.set_link(Link::Idle);
    let attempt = state.record_attempt();
    let steps = state.config().progress;

    let mut effects = match classify_poll_response(&raw) {
        Inbound::Personas(_) => return succeed(state, raw),
        Inbound::Malformed if state.phase() != Phase::Generating => {
            return on_malformed(state, &raw);
        }
        Inbound::Malformed => {
            tracker_warn!("Ignoring malformed invoke response for {}", state.job_id());
            Vec::new()
        }
        _ if state.phase() == Phase::Pending => {
            changed(state, |status| status.begin_generating(steps.watermark))
        }
        _ => changed(state, |status| status.tick(steps.step, steps.cap)),
    };

    let retry = match &state.config().transport {
        Transport::Poll { retry, .. } => *retry,
        Transport::Stream => RetryPolicy::Disabled,
    };
    match retry {
        RetryPolicy::Enabled { interval, .. } if attempt < retry.max_attempts() => {
            state.set_link(Link::Waiting);
            effects.push(Effect::SchedulePoll { delay: interval });
            effects
        }
        RetryPolicy::Enabled { .. } => {
            tracker_warn!("Job {} still running after {} attempts", state.job_id(), attempt);
            fail(state, MSG_TIMED_OUT, false)
        }
        RetryPolicy::Disabled => fail(state, MSG_INCOMPLETE, false),
    }
}

fn on_poll_due(state: &mut TrackerState) -> Vec<Effect> {
    if state.link() != Link::Waiting || state.status().is_terminal() {
        return Vec::new();
    }
    match state.invoke_request() {
        Some(request) => {
            state.set_link(Link::Invoking);
            vec![Effect::Invoke { request }]
        }
        None => Vec::new(),
    }
}

fn on_transport_error(state: &mut TrackerState, reason: &str) -> Vec<Effect> {
    if state.phase() == Phase::Completed {
        tracker_debug!("Ignoring transport error after completion: {}", reason);
        return Vec::new();
    }
    if !matches!(state.link(), Link::Streaming | Link::Invoking) {
        return Vec::new();
    }
    tracker_warn!("Transport error for job {}: {}", state.job_id(), reason);
    fail(state, MSG_CONNECTION_LOST, true)
}

fn on_redirect_due(state: &mut TrackerState) -> Vec<Effect> {
    if state.redirect() != Redirect::Scheduled {
        return Vec::new();
    }
    state.set_redirect(Redirect::Done);
    let mut effects = Vec::with_capacity(2);
    if state.link().is_active() {
        effects.push(Effect::CloseConnection);
    }
    state.set_link(Link::Closed);
    effects.push(Effect::Navigate {
        route: state.config().redirect.route(state.job_id()),
    });
    effects
}

fn on_malformed(state: &mut TrackerState, raw: &str) -> Vec<Effect> {
    // A stray heartbeat during active generation must not abort the job.
    if state.phase() == Phase::Generating {
        tracker_warn!("Swallowing malformed message for {}: {:?}", state.job_id(), raw);
        return Vec::new();
    }
    tracker_warn!("Malformed message for {}: {:?}", state.job_id(), raw);
    let close = state.link().is_active();
    fail(state, MSG_MALFORMED, close)
}

fn succeed(state: &mut TrackerState, raw: String) -> Vec<Effect> {
    if !state.status_mut().complete() {
        return Vec::new();
    }
    // The stream stays open until navigation; poll has nothing outstanding.
    if state.link() != Link::Streaming {
        state.set_link(Link::Closed);
    }
    state.set_redirect(Redirect::Scheduled);
    vec![
        Effect::PersistResult {
            key: result_key(state.job_id()),
            payload: raw,
        },
        Effect::ClearActiveJob,
        Effect::StatusChanged(state.status().clone()),
        Effect::ScheduleRedirect {
            delay: state.config().redirect_delay,
        },
    ]
}

fn fail(state: &mut TrackerState, message: impl Into<String>, close: bool) -> Vec<Effect> {
    if !state.status_mut().fail(message) {
        return Vec::new();
    }
    state.set_link(Link::Closed);
    let mut effects = Vec::with_capacity(2);
    if close {
        effects.push(Effect::CloseConnection);
    }
    effects.push(Effect::StatusChanged(state.status().clone()));
    effects
}

fn changed(
    state: &mut TrackerState,
    transition: impl FnOnce(&mut crate::JobStatus) -> bool,
) -> Vec<Effect> {
    let before = state.status().clone();
    if transition(state.status_mut()) && *state.status() != before {
        vec![Effect::StatusChanged(state.status().clone())]
    } else {
        Vec::new()
    }
}
