//! Wire protocol for Simlink
//!
//! Defines the JSON envelope exchanged with the simulation backend and the
//! typed payloads it carries: state snapshots downstream, commands upstream.

pub mod envelope;
pub mod snapshot;

pub use envelope::{
    CommandData, ConnectionNotice, ConnectionStatus, Envelope, OutboundIntent, Payload,
    UpstreamError, TAG_COMMAND, TAG_CONNECTION, TAG_ERROR, TAG_STATE_UPDATE,
};
pub use snapshot::{AirQuality, SimulationSnapshot, TrafficFlow, TrafficLight, Vehicle};

use thiserror::Error;

/// Failure to turn a raw inbound frame into a typed envelope.
///
/// Decode failures are per-frame: the caller drops the frame and keeps the
/// channel alive.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed envelope: {0}")]
    Malformed(serde_json::Error),

    #[error("Unknown envelope tag: {0}")]
    UnknownTag(String),

    #[error("Payload does not match tag {tag}: {source}")]
    Payload {
        tag: String,
        source: serde_json::Error,
    },
}

/// Failure to serialize an outbound envelope.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
