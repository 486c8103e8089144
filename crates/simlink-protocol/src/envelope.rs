//! Wire envelope encoding and decoding
//!
//! Every frame on the wire is `{"type": <tag>, "data": <payload>,
//! "timestamp": <epoch millis>}`. The payload shape is fully determined by
//! the tag; decoding rejects envelopes whose payload does not match.

use crate::{snapshot::SimulationSnapshot, DecodeError, EncodeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag for a state snapshot pushed by the backend.
pub const TAG_STATE_UPDATE: &str = "state-update";
/// Tag for an operator command (also used for subscription requests).
pub const TAG_COMMAND: &str = "command";
/// Tag for an error reported deliberately by the backend.
pub const TAG_ERROR: &str = "error";
/// Tag for a connection-status notice.
pub const TAG_CONNECTION: &str = "connection";

/// Raw wire shape, before the tag/payload pairing is validated.
#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: String,
    data: Value,
    timestamp: u64,
}

/// Payload of a `command` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Map<String, Value>>,
}

/// Payload of an `error` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Connection status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Payload of a `connection` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNotice {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Typed payload of a decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    StateUpdate(SimulationSnapshot),
    Command(CommandData),
    Error(UpstreamError),
    Connection(ConnectionNotice),
}

impl Payload {
    /// The wire tag this payload is carried under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::StateUpdate(_) => TAG_STATE_UPDATE,
            Self::Command(_) => TAG_COMMAND,
            Self::Error(_) => TAG_ERROR,
            Self::Connection(_) => TAG_CONNECTION,
        }
    }
}

/// An outbound intent issued by a consumer.
///
/// Intents are fire-and-forget: they carry no identity and expect no
/// acknowledgement from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundIntent {
    /// A discrete operator action.
    Command {
        name: String,
        params: Option<serde_json::Map<String, Value>>,
    },
    /// Request scoped updates for an area of the simulation.
    SubscribeArea { area_id: String },
}

impl OutboundIntent {
    /// Lower the intent to its `command` payload representation.
    ///
    /// Subscription requests travel as the `subscribe` command with the area
    /// identifier in `params`.
    pub fn command_data(&self) -> CommandData {
        match self {
            Self::Command { name, params } => CommandData {
                command: name.clone(),
                params: params.clone(),
            },
            Self::SubscribeArea { area_id } => {
                let mut params = serde_json::Map::new();
                params.insert("areaId".to_string(), Value::String(area_id.clone()));
                CommandData {
                    command: "subscribe".to_string(),
                    params: Some(params),
                }
            }
        }
    }
}

/// A decoded wire envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub payload: Payload,
    /// Send/receive time in epoch milliseconds.
    pub timestamp: u64,
}

impl Envelope {
    /// Current time in epoch milliseconds.
    pub fn timestamp_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Decode a raw text frame into a typed envelope.
    ///
    /// Decoding is two-stage: parse the outer wire shape, then deserialize
    /// the payload against the shape its tag requires.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let raw: RawEnvelope = serde_json::from_str(raw).map_err(DecodeError::Malformed)?;

        let payload = match raw.tag.as_str() {
            TAG_STATE_UPDATE => serde_json::from_value(raw.data).map(Payload::StateUpdate),
            TAG_COMMAND => serde_json::from_value(raw.data).map(Payload::Command),
            TAG_ERROR => serde_json::from_value(raw.data).map(Payload::Error),
            TAG_CONNECTION => serde_json::from_value(raw.data).map(Payload::Connection),
            other => return Err(DecodeError::UnknownTag(other.to_string())),
        }
        .map_err(|source| DecodeError::Payload {
            tag: raw.tag,
            source,
        })?;

        Ok(Self {
            payload,
            timestamp: raw.timestamp,
        })
    }

    /// Encode this envelope as a text frame.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let data = match &self.payload {
            Payload::StateUpdate(snapshot) => serde_json::to_value(snapshot)?,
            Payload::Command(command) => serde_json::to_value(command)?,
            Payload::Error(error) => serde_json::to_value(error)?,
            Payload::Connection(notice) => serde_json::to_value(notice)?,
        };

        let raw = RawEnvelope {
            tag: self.payload.tag().to_string(),
            data,
            timestamp: self.timestamp,
        };

        Ok(serde_json::to_string(&raw)?)
    }

    /// Encode an outbound intent as a `command` envelope.
    pub fn encode_intent(intent: &OutboundIntent, timestamp: u64) -> Result<String, EncodeError> {
        Self {
            payload: Payload::Command(intent.command_data()),
            timestamp,
        }
        .encode()
    }
}
