//! Shared domain types for Wagate.
//!
//! This crate contains the types used across the Wagate gateway: session
//! lifecycle, contacts, status broadcasts, presence, gateway configuration,
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod contact;
pub mod error;
pub mod presence;
pub mod session;
pub mod status;
