//! HTTP/REST API layer for Wagate.
//!
//! Axum-based REST API at `/api/` with API key authentication,
//! envelope response format, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
