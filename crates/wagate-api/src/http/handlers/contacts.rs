//! Contact HTTP handlers.
//!
//! These endpoints address the session by `?session=` query parameter:
//! - GET  /api/contacts/all             - List contacts
//! - GET  /api/contacts                 - Get one contact
//! - GET  /api/contacts/check-exists    - Is a number registered?
//! - GET  /api/contacts/about           - Contact's about text
//! - GET  /api/contacts/profile-picture - Contact's avatar URL
//! - POST /api/contacts/block           - Block a contact
//! - POST /api/contacts/unblock         - Unblock a contact
//!
//! All of them require the session to be `WORKING`; anything else maps to
//! 404/422 through [`AppError`].

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use wagate_types::contact::{
    CheckNumberExistsQuery, Contact, ContactQuery, ContactRequest, ContactsPaginationParams,
    NumberExistResult, ProfilePictureQuery, ProfilePictureResponse,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Combined query for `GET /api/contacts/all`.
///
/// Kept flat (no nested structs) because query-string deserialization does
/// not support `#[serde(flatten)]` for numeric fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsListQuery {
    pub session: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// GET /api/contacts/all - List the session's contacts.
pub async fn get_all_contacts(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ContactsListQuery>,
) -> Result<Json<ApiResponse<Vec<Contact>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&query.session)?;
    let pagination = ContactsPaginationParams {
        limit: query.limit,
        offset: query.offset,
        sort_by: query.sort_by,
    };
    let contacts = session.get_contacts(&pagination).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(contacts, request_id, elapsed)))
}

/// GET /api/contacts - Get a single contact. `data` is null when unknown.
pub async fn get_contact(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ContactQuery>,
) -> Result<Json<ApiResponse<Option<Contact>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&query.session)?;
    let contact = session.get_contact(&query.contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(contact, request_id, elapsed)))
}

/// GET /api/contacts/check-exists - Is this phone number registered?
pub async fn check_number_exists(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<CheckNumberExistsQuery>,
) -> Result<Json<ApiResponse<NumberExistResult>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&query.session)?;
    let result = session.check_number_exists(&query.phone).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(result, request_id, elapsed)))
}

/// GET /api/contacts/about - Contact's about text; null when privacy hides it.
pub async fn get_contact_about(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ContactQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&query.session)?;
    let about = session.get_contact_about(&query.contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "about": about }),
        request_id,
        elapsed,
    )))
}

/// GET /api/contacts/profile-picture - Avatar URL; null when privacy hides it.
pub async fn get_profile_picture(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ProfilePictureQuery>,
) -> Result<Json<ApiResponse<ProfilePictureResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&query.session)?;
    let url = session
        .get_profile_picture(&query.contact_id, query.refresh)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        ProfilePictureResponse {
            profile_picture_url: url,
        },
        request_id,
        elapsed,
    )))
}

/// POST /api/contacts/block - Block a contact.
pub async fn block_contact(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<ContactRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&body.session)?;
    session.block_contact(&body.contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "contactId": body.contact_id, "blocked": true }),
        request_id,
        elapsed,
    )))
}

/// POST /api/contacts/unblock - Unblock a contact.
pub async fn unblock_contact(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<ContactRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&body.session)?;
    session.unblock_contact(&body.contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "contactId": body.contact_id, "blocked": false }),
        request_id,
        elapsed,
    )))
}
