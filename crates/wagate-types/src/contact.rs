//! Contact types and query DTOs.
//!
//! Wire shapes follow the upstream chat-network conventions: contact IDs are
//! `<phone>@c.us` strings and JSON fields are camelCase.

use serde::{Deserialize, Serialize};

/// A contact as seen by one session's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Chat-network contact ID, e.g. `11111111111@c.us`.
    pub id: String,
    /// Name from the tenant's address book, if saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name the contact set for themselves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub is_business: bool,
}

/// Query for a single contact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub session: String,
    pub contact_id: String,
}

/// Pagination and ordering for contact listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsPaginationParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    /// Field to sort by; only `id` and `name` are recognized.
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// Query for `GET /api/contacts/check-exists`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckNumberExistsQuery {
    pub session: String,
    /// Phone number in international format, digits only.
    pub phone: String,
}

/// Result of a phone-number registration check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberExistResult {
    pub number_exists: bool,
    /// Canonical chat ID when the number is registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Query for `GET /api/contacts/profile-picture`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureQuery {
    pub session: String,
    pub contact_id: String,
    /// Bypass the engine-side cache and refetch from the network.
    #[serde(default)]
    pub refresh: bool,
}

/// Response for `GET /api/contacts/profile-picture`.
///
/// `None` means the contact's privacy settings deny access -- that is a
/// legitimate empty result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    #[serde(rename = "profilePictureURL")]
    pub profile_picture_url: Option<String>,
}

/// Body for block/unblock requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub session: String,
    pub contact_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_serializes_camel_case() {
        let contact = Contact {
            id: "123@c.us".to_string(),
            name: None,
            push_name: Some("Alice".to_string()),
            is_blocked: false,
            is_business: true,
        };
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["pushName"], "Alice");
        assert_eq!(json["isBusiness"], true);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_profile_picture_query_refresh_defaults_false() {
        let query: ProfilePictureQuery =
            serde_json::from_str(r#"{"session":"alice","contactId":"1@c.us"}"#).unwrap();
        assert!(!query.refresh);
    }

    #[test]
    fn test_profile_picture_response_field_name() {
        let resp = ProfilePictureResponse {
            profile_picture_url: Some("https://example.com/pic.jpg".to_string()),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("profilePictureURL"));
    }
}
