//! Custom axum extractors.

pub mod auth;
