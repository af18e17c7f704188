use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Recipient used by broadcast and status messages.
pub const BROADCAST_RECIPIENT: &str = "ALL";

/// Status body written when a participant registers.
pub const JOINED_STATUS: &str = "joined";

/// Status body written by the sweep when a participant is evicted.
pub const LEFT_STATUS: &str = "left";

/// Message times are wall-clock `HH:MM:SS` strings (UTC).
const MESSAGE_TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    PrivateMessage,
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::PrivateMessage => "private_message",
            MessageKind::Status => "status",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message kind `{0}`")]
pub struct UnknownMessageKind(pub String);

impl FromStr for MessageKind {
    type Err = UnknownMessageKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "message" => Ok(MessageKind::Message),
            "private_message" => Ok(MessageKind::PrivateMessage),
            "status" => Ok(MessageKind::Status),
            other => Err(UnknownMessageKind(other.to_string())),
        }
    }
}

/// A registered chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    /// Epoch milliseconds of the last heartbeat (or of registration).
    #[serde(rename = "lastHeartbeat")]
    pub last_heartbeat: i64,
}

impl Participant {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_heartbeat: now.timestamp_millis(),
        }
    }
}

/// A stored chat message, serialized with the client protocol field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "to")]
    pub recipient: String,
    #[serde(rename = "text")]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(rename = "time")]
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            kind,
            timestamp: format_message_time(now),
        }
    }

    /// Synthetic broadcast status about `name` (join/leave).
    pub fn status(name: impl Into<String>, body: &str, now: DateTime<Utc>) -> Self {
        Self::new(name, BROADCAST_RECIPIENT, body, MessageKind::Status, now)
    }
}

pub fn format_message_time(now: DateTime<Utc>) -> String {
    now.format(MESSAGE_TIME_FORMAT).to_string()
}

/// Client payload for posting or editing a message.
///
/// Every field is optional at the wire level so missing fields surface as
/// validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDraft {
    pub to: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
}
