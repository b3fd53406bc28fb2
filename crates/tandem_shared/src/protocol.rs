//! Wire protocol shared between host and guest.
//!
//! Every frame on the data channel is one JSON object of the form
//! `{"type": "<tag>", "payload": {...}}`. The set of tags is closed and
//! versionless; a frame with an unknown tag is rejected as a whole so the
//! receiver can log and drop it without touching session state.
//!
//! | Tag       | Direction      | Payload                       |
//! |-----------|----------------|-------------------------------|
//! | `state`   | host -> guest  | both players + timestamp (ms) |
//! | `input`   | guest -> host  | the guest's `InputState`      |
//! | `welcome` | host -> guest  | host name, room id            |
//! | `intro`   | guest -> host  | guest name                    |
//! | `chat`    | either         | author, text                  |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::InputState;
use crate::player::Players;

/// Authoritative snapshot of both player slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Both slots as simulated by the host.
    pub players: Players,
    /// Host wall-clock time in milliseconds since the unix epoch.
    pub timestamp: u64,
}

/// A single protocol message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Message {
    /// Host -> guest: authoritative state.
    State(StateSnapshot),
    /// Guest -> host: the guest's full input vector.
    Input {
        /// The sender's input.
        state: InputState,
    },
    /// Host -> guest, once per connection.
    Welcome {
        /// Host display name.
        #[serde(rename = "hostName")]
        host_name: String,
        /// Room the guest joined.
        #[serde(rename = "roomId")]
        room_id: String,
    },
    /// Guest -> host, once per connection.
    Intro {
        /// Guest display name.
        #[serde(rename = "guestName")]
        guest_name: String,
    },
    /// Either direction, informational.
    Chat {
        /// Display name of the writer.
        author: String,
        /// Message body.
        text: String,
    },
}

/// Errors raised while encoding or decoding protocol frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame is not valid JSON or the payload does not match its tag.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame has no string `type` field.
    #[error("frame has no type tag")]
    MissingTag,

    /// The frame's tag is not part of the protocol.
    #[error("unrecognized message type: {0}")]
    UnknownTag(String),

    /// A message could not be serialized.
    #[error("failed to encode {tag} message: {source}")]
    Encode {
        /// Tag of the message being encoded.
        tag: &'static str,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl Message {
    /// Every tag the protocol understands.
    pub const TAGS: [&'static str; 5] = ["state", "input", "welcome", "intro", "chat"];

    /// Returns this message's wire tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Input { .. } => "input",
            Self::Welcome { .. } => "welcome",
            Self::Intro { .. } => "intro",
            Self::Chat { .. } => "chat",
        }
    }

    /// Serializes this message into one wire frame.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ProtocolError::Encode {
            tag: self.tag(),
            source,
        })
    }

    /// Parses one wire frame.
    ///
    /// The tag is checked before the payload so that an unknown message type
    /// is reported as such rather than as a generic parse failure.
    pub fn decode(frame: &[u8]) -> ProtocolResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(frame)?;
        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingTag)?;
        if !Self::TAGS.contains(&tag) {
            return Err(ProtocolError::UnknownTag(tag.to_owned()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Arena;

    #[test]
    fn test_wire_shape() {
        let frame = Message::Welcome {
            host_name: "Ana".into(),
            room_id: "R1".into(),
        }
        .encode()
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["payload"]["hostName"], "Ana");
        assert_eq!(value["payload"]["roomId"], "R1");
    }

    #[test]
    fn test_payload_field_names() {
        let chat = Message::Chat {
            author: "Bo".into(),
            text: "hi".into(),
        };
        let value: serde_json::Value = serde_json::from_slice(&chat.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "chat");
        assert_eq!(value["payload"]["author"], "Bo");
        assert_eq!(value["payload"]["text"], "hi");

        let state = Message::State(StateSnapshot {
            players: Players::spawn(&Arena::default()),
            timestamp: 1,
        });
        let value: serde_json::Value = serde_json::from_slice(&state.encode().unwrap()).unwrap();
        let host = &value["payload"]["players"]["host"];
        assert!(host["position"]["x"].is_number());
        assert!(host["radius"].is_number());
        assert_eq!(value["payload"]["timestamp"], 1);
    }

    #[test]
    fn test_state_round_trip() {
        let message = Message::State(StateSnapshot {
            players: Players::spawn(&Arena::default()),
            timestamp: 1_700_000_000_000,
        });
        let decoded = Message::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_input_payload() {
        let frame = br#"{"type":"input","payload":{"state":{"up":false,"down":false,"left":false,"right":true}}}"#;
        match Message::decode(frame).unwrap() {
            Message::Input { state } => assert!(state.right && !state.left),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = Message::decode(br#"{"type":"teleport","payload":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTag(tag) if tag == "teleport"));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let err = Message::decode(br#"{"type":"input","payload":{"state":"fast"}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));

        let err = Message::decode(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));

        let err = Message::decode(br#"{"payload":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingTag));
    }
}
