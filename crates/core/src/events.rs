//! Event payloads emitted by a conversation client, and the two session values
//! the service mirrors from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status reported by the conversation client.
///
/// The set of statuses belongs to the client; unknown values are carried
/// verbatim in `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Other(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnecting => "disconnecting",
            ConnectionStatus::Other(status) => status,
        }
    }
}

impl From<&str> for ConnectionStatus {
    fn from(value: &str) -> Self {
        match value {
            "disconnected" => ConnectionStatus::Disconnected,
            "connecting" => ConnectionStatus::Connecting,
            "connected" => ConnectionStatus::Connected,
            "disconnecting" => ConnectionStatus::Disconnecting,
            other => ConnectionStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ConnectionStatus {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<ConnectionStatus> for String {
    fn from(value: ConnectionStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the agent is currently talking or waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationMode {
    #[default]
    Listening,
    Speaking,
    Other(String),
}

impl ConversationMode {
    pub fn as_str(&self) -> &str {
        match self {
            ConversationMode::Listening => "listening",
            ConversationMode::Speaking => "speaking",
            ConversationMode::Other(mode) => mode,
        }
    }
}

impl From<&str> for ConversationMode {
    fn from(value: &str) -> Self {
        match value {
            "listening" => ConversationMode::Listening,
            "speaking" => ConversationMode::Speaking,
            other => ConversationMode::Other(other.to_string()),
        }
    }
}

impl From<String> for ConversationMode {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<ConversationMode> for String {
    fn from(value: ConversationMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `on_connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectEvent {
    pub conversation_id: String,
}

/// Payload of `on_error`. The service forwards it without interpreting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    User,
    Ai,
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::User => write!(f, "user"),
            MessageSource::Ai => write!(f, "ai"),
        }
    }
}

/// Payload of `on_message`: a transcript line from either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub source: MessageSource,
    pub message: String,
}

/// Payload of `on_status_change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ConnectionStatus,
}

/// Payload of `on_mode_change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub mode: ConversationMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_known_and_unknown_values() {
        assert_eq!(ConnectionStatus::from("connected"), ConnectionStatus::Connected);
        assert_eq!(
            ConnectionStatus::from("reconnecting"),
            ConnectionStatus::Other("reconnecting".to_string())
        );
        assert_eq!(ConnectionStatus::from("reconnecting").as_str(), "reconnecting");
        assert_eq!(ConnectionStatus::default().to_string(), "disconnected");
    }

    #[test]
    fn test_mode_serializes_as_plain_string() {
        let change = ModeChange {
            mode: ConversationMode::Speaking,
        };
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"mode":"speaking"}"#);

        let parsed: ModeChange = serde_json::from_str(r#"{"mode":"thinking"}"#).unwrap();
        assert_eq!(parsed.mode, ConversationMode::Other("thinking".to_string()));
    }

    #[test]
    fn test_message_source_display() {
        assert_eq!(MessageSource::User.to_string(), "user");
        assert_eq!(MessageSource::Ai.to_string(), "ai");
        let event: MessageEvent =
            serde_json::from_str(r#"{"source":"ai","message":"hello"}"#).unwrap();
        assert_eq!(event.source, MessageSource::Ai);
    }
}
