//! Status-broadcast ("story") request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media payload for image/voice/video statuses.
///
/// Exactly one of `url` or `data` (base64) should be set; the engine fetches
/// `url` itself when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMedia {
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded content, used when no URL is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Text status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStatus {
    pub text: String,
    /// Background color as `#RRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Engine-defined font index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<u32>,
}

/// Image status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatus {
    pub media: StatusMedia,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Voice-note status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStatus {
    pub media: StatusMedia,
}

/// Video status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub media: StatusMedia,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Body for `POST /api/{session}/status/delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStatusRequest {
    /// ID previously returned in [`SentStatus`].
    pub id: String,
}

/// Acknowledgement for a posted status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentStatus {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_status_minimal() {
        let status: TextStatus = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(status.text, "hello");
        assert!(status.background_color.is_none());
        assert!(status.font.is_none());
    }

    #[test]
    fn test_image_status_with_url_media() {
        let status: ImageStatus = serde_json::from_str(
            r#"{"media":{"mimetype":"image/jpeg","url":"https://example.com/a.jpg"},"caption":"hi"}"#,
        )
        .unwrap();
        assert_eq!(status.media.mimetype, "image/jpeg");
        assert!(status.media.data.is_none());
        assert_eq!(status.caption.as_deref(), Some("hi"));
    }
}
