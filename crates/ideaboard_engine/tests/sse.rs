use ideaboard_engine::{SseDecoder, SseEvent};
use pretty_assertions::assert_eq;

fn data_of(events: Vec<SseEvent>) -> Vec<String> {
    events.into_iter().map(|event| event.data).collect()
}

#[test]
fn decodes_events_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(b"data: {\"run_");
    events.extend(decoder.push(b"id\":\"r1\"}\n"));
    assert!(events.is_empty());
    events.extend(decoder.push(b"\ndata: {\"status\":\"running\"}\n\n"));

    assert_eq!(
        data_of(events),
        vec![
            r#"{"run_id":"r1"}"#.to_string(),
            r#"{"status":"running"}"#.to_string(),
        ]
    );
}

#[test]
fn joins_multi_line_data_and_keeps_event_names() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b"event: values\nid: 7\ndata: line one\ndata:line two\n\n");

    assert_eq!(
        events,
        vec![SseEvent {
            event: Some("values".to_string()),
            data: "line one\nline two".to_string(),
            id: Some("7".to_string()),
        }]
    );
    assert_eq!(decoder.last_event_id(), Some("7"));
}

#[test]
fn handles_crlf_split_between_chunks() {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(b"data: a\r");
    events.extend(decoder.push(b"\n\r\n"));

    assert_eq!(data_of(events), vec!["a".to_string()]);
}

#[test]
fn comments_and_empty_events_are_not_dispatched() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b": keep-alive\n\nevent: metadata\n\nretry: 1000\n\n");

    assert!(events.is_empty());
}

#[test]
fn utf8_split_inside_a_character_survives() {
    let text = "data: {\"name\":\"Zoë\"}\n\n".as_bytes();
    let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(&text[..split]);
    events.extend(decoder.push(&text[split..]));

    assert_eq!(data_of(events), vec![r#"{"name":"Zoë"}"#.to_string()]);
}

#[test]
fn unterminated_trailing_event_is_dropped() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b"data: partial");

    assert!(events.is_empty());
}

#[test]
fn leading_byte_order_mark_is_skipped() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push("\u{FEFF}data: {\"run_id\":\"r1\"}\n\n".as_bytes());

    assert_eq!(data_of(events), vec![r#"{"run_id":"r1"}"#.to_string()]);
}

#[test]
fn byte_order_mark_split_across_chunks_is_skipped_only_at_the_start() {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(b"\xEF\xBB");
    events.extend(decoder.push(b"\xBFdata: first\n\n"));
    events.extend(decoder.push("\u{FEFF}data: second\n\n".as_bytes()));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "first");
}
