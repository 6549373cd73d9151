use serde_json::{Map, Value};

/// What an inbound stream message or poll response means for the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Run metadata (`run_id` / `metadata`) without personas.
    RunStarted,
    /// Terminal payload with at least one generated persona.
    Personas(Vec<Value>),
    /// `status: completed` echoed before the personas arrive.
    Finalizing,
    /// Anything else that parsed.
    Progress,
    /// Body did not parse as a JSON object.
    Malformed,
}

/// Classifies one event-stream `data` payload.
pub fn classify_stream_message(raw: &str) -> Inbound {
    let Some(object) = parse_object(raw) else {
        return Inbound::Malformed;
    };
    if let Some(personas) = personas(&object) {
        return Inbound::Personas(personas.to_vec());
    }
    if object.contains_key("run_id") || object.contains_key("metadata") {
        return Inbound::RunStarted;
    }
    if is_completed(&object) {
        return Inbound::Finalizing;
    }
    Inbound::Progress
}

/// Classifies the body of one invoke response.
///
/// Only `status: completed` together with a non-empty persona list is terminal.
pub fn classify_poll_response(raw: &str) -> Inbound {
    let Some(object) = parse_object(raw) else {
        return Inbound::Malformed;
    };
    match personas(&object) {
        Some(personas) if is_completed(&object) => Inbound::Personas(personas.to_vec()),
        _ => Inbound::Progress,
    }
}

/// Returns the non-empty persona list under either `persona` or `personas`.
pub fn personas(object: &Map<String, Value>) -> Option<&[Value]> {
    ["persona", "personas"]
        .iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_array)
        .find(|list| !list.is_empty())
        .map(Vec::as_slice)
}

fn is_completed(object: &Map<String, Value>) -> bool {
    object.get("status").and_then(Value::as_str) == Some("completed")
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}
