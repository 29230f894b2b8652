//! HTTP request handlers for the REST API.

pub mod contacts;
pub mod presence;
pub mod session;
pub mod status;
