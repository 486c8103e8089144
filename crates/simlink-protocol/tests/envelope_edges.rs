use simlink_protocol::{DecodeError, Envelope, Payload};

#[test]
fn truncated_frame_is_malformed() {
    let raw = r#"{"type": "state-update", "data": {"trafficFl"#;
    assert!(matches!(
        Envelope::decode(raw),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn envelope_without_timestamp_is_malformed() {
    let raw = r#"{"type": "error", "data": {"message": "boom"}}"#;
    assert!(matches!(
        Envelope::decode(raw),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn wrong_data_type_under_tag_is_payload_error() {
    // `data` must be an object matching the tag's shape, not a bare string.
    let raw = r#"{"type": "error", "data": "boom", "timestamp": 0}"#;
    assert!(matches!(
        Envelope::decode(raw),
        Err(DecodeError::Payload { .. })
    ));
}

#[test]
fn extra_snapshot_fields_are_ignored() {
    // Forward compatibility: additional fields the client does not know about
    // must not fail the decode.
    let raw = r#"{
        "type": "state-update",
        "data": {
            "trafficFlow": {"queues": [1], "phase": 0, "timestamp": 1.0},
            "airQuality": {"pm25": 1.0, "timestamp": 1.0},
            "weather": {"rain": true}
        },
        "timestamp": 7
    }"#;

    let envelope = Envelope::decode(raw).expect("decode");
    match envelope.payload {
        Payload::StateUpdate(snapshot) => assert_eq!(snapshot.traffic_flow.queues, vec![1]),
        other => panic!("expected state update, got {other:?}"),
    }
}

#[test]
fn queue_lengths_must_be_unsigned() {
    let raw = r#"{
        "type": "state-update",
        "data": {
            "trafficFlow": {"queues": [-3, 5], "phase": 0, "timestamp": 1.0},
            "airQuality": {"pm25": 1.0, "timestamp": 1.0}
        },
        "timestamp": 7
    }"#;

    assert!(matches!(
        Envelope::decode(raw),
        Err(DecodeError::Payload { .. })
    ));
}
