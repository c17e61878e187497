/// Wire envelopes for the chat WebSocket protocol
///
/// Both directions use `{ "type": "...", "data": { ... } }` JSON objects with
/// camelCase payload fields. Identifiers travel as strings to avoid precision
/// loss in JavaScript clients.
use crate::message::ContentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client -> server envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Send a chat message
    Send(SendPayload),
    /// Typing notification for a 1:1 conversation
    Typing(TypingPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayload {
    pub content: String,
    pub content_type: ContentType,
    /// Correlation id echoed back on the acknowledgement
    pub temp_id: String,
    /// Exactly one of `receiver_id` / `group_id` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub to_user_id: String,
}

/// Server -> client envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Acknowledgement of a previously sent message
    Ack(MessagePayload),
    /// Live broadcast of a message
    Message(MessagePayload),
    /// A peer is typing
    Typing(TypingEvent),
    /// Server-reported count of connected sessions
    OnlineCount(CountPayload),
    /// Envelope kinds this core does not consume (e.g. friend_request)
    Unknown,
}

// Decoded by hand: the kind discriminant is matched first, and unrecognized
// kinds collapse to `Unknown` whatever their payload looks like. The derived
// adjacently tagged decoder cannot express that; `#[serde(other)]` only
// matches when the payload is absent.
impl<'de> Deserialize<'de> for ServerEnvelope {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawEnvelope {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            data: serde_json::Value,
        }

        let raw = RawEnvelope::deserialize(deserializer)?;
        Ok(match raw.kind.as_str() {
            "ack" => ServerEnvelope::Ack(payload(raw.data)?),
            "message" => ServerEnvelope::Message(payload(raw.data)?),
            "typing" => ServerEnvelope::Typing(payload(raw.data)?),
            "online_count" => ServerEnvelope::OnlineCount(payload(raw.data)?),
            _ => ServerEnvelope::Unknown,
        })
    }
}

fn payload<T, E>(data: serde_json::Value) -> std::result::Result<T, E>
where
    T: serde::de::DeserializeOwned,
    E: serde::de::Error,
{
    serde_json::from_value(data).map_err(E::custom)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Server-assigned identifier, authoritative once present
    pub id: Option<String>,
    /// Echo of the client correlation id, on acks only
    pub temp_id: Option<String>,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    pub created_at: Option<DateTime<Utc>>,
    pub receiver_id: Option<String>,
    pub group_id: Option<String>,
    /// Display metadata attached to group broadcasts
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    #[serde(alias = "from")]
    pub sender_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountPayload {
    pub count: u32,
}

impl ClientEnvelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientEnvelope::Send(_) => "send",
            ClientEnvelope::Typing(_) => "typing",
        }
    }
}

impl ServerEnvelope {
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerEnvelope::Ack(_) => "ack",
            ServerEnvelope::Message(_) => "message",
            ServerEnvelope::Typing(_) => "typing",
            ServerEnvelope::OnlineCount(_) => "online_count",
            ServerEnvelope::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({})", self.kind())
    }
}
