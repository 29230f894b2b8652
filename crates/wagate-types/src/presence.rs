//! Presence types: what a session broadcasts and what it observes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presence a session can broadcast, or that a contact was last seen in.
///
/// A contact nobody has observed yet is `Offline`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    #[default]
    Offline,
    Typing,
    Recording,
    Paused,
}

/// Body for `POST /api/{session}/presence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPresenceRequest {
    pub presence: Presence,
    /// Chat to scope typing/recording presence to; global when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Last known presence of a contact.
///
/// `last_seen` is only populated when the contact's privacy settings allow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub contact_id: String,
    pub last_known_presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_defaults_to_offline() {
        assert_eq!(Presence::default(), Presence::Offline);
    }

    #[test]
    fn test_presence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Presence::Recording).unwrap(),
            "\"recording\""
        );
    }

    #[test]
    fn test_set_presence_request_without_chat() {
        let req: SetPresenceRequest = serde_json::from_str(r#"{"presence":"online"}"#).unwrap();
        assert_eq!(req.presence, Presence::Online);
        assert!(req.chat_id.is_none());
    }
}
