//! Action message wire types
//!
//! The control vocabulary between intake and player. Messages exist only
//! in transit; nothing here is ever persisted.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed set of control actions
///
/// Dispatch is an exhaustive match; an unknown action string on the wire
/// fails decode rather than being silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Play,
    Pause,
    Resume,
    Skip,
    Stop,
    Rewind,
    VolumeUp,
    VolumeDown,
    Toggle,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Play => "play",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Skip => "skip",
            Action::Stop => "stop",
            Action::Rewind => "rewind",
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::Toggle => "toggle",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One control instruction routed from intake to player
///
/// Wire form is compact JSON:
/// `{"action":"play","chat_id":1,"user_id":2,"payload":{...}}`.
/// All subscribers on the shared channel see all chats' traffic and filter
/// locally by `chat_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub action: Action,
    pub chat_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl ActionMessage {
    /// A message with an empty payload
    pub fn new(action: Action, chat_id: i64, user_id: i64) -> Self {
        Self {
            action,
            chat_id,
            user_id,
            payload: Map::new(),
        }
    }

    /// A `play` message carrying the locator and display title of the item
    /// the player should start
    pub fn play(chat_id: i64, user_id: i64, locator: &str, title: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("locator".to_string(), Value::String(locator.to_string()));
        payload.insert("title".to_string(), Value::String(title.to_string()));
        Self {
            action: Action::Play,
            chat_id,
            user_id,
            payload,
        }
    }

    /// Read a string payload field, if present
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Encode to the compact wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the wire form; unknown actions and malformed payloads
    /// are errors
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_empty_payload() {
        let msg = ActionMessage::new(Action::Pause, 42, 7);
        let encoded = msg.to_json().unwrap();
        let decoded = ActionMessage::from_json(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trip_with_payload() {
        let msg = ActionMessage::play(-100123, 555, "https://example.com/a.mp3", "Song A");
        let encoded = msg.to_json().unwrap();
        let decoded = ActionMessage::from_json(&encoded).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.payload_str("locator"), Some("https://example.com/a.mp3"));
        assert_eq!(decoded.payload_str("title"), Some("Song A"));
    }

    #[test]
    fn actions_use_snake_case_on_the_wire() {
        let msg = ActionMessage::new(Action::VolumeUp, 1, 2);
        let encoded = msg.to_json().unwrap();
        assert!(encoded.contains(r#""action":"volume_up""#));
    }

    #[test]
    fn missing_payload_decodes_as_empty() {
        let raw = r#"{"action":"skip","chat_id":3,"user_id":4}"#;
        let decoded = ActionMessage::from_json(raw).unwrap();
        assert_eq!(decoded.action, Action::Skip);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let raw = r#"{"action":"shuffle","chat_id":3,"user_id":4,"payload":{}}"#;
        assert!(ActionMessage::from_json(raw).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(ActionMessage::from_json("not json at all").is_err());
        assert!(ActionMessage::from_json(r#"{"chat_id":3}"#).is_err());
    }
}
