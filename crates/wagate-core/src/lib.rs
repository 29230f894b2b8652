//! Session orchestration engine for Wagate.
//!
//! This crate defines the "ports" (engine traits) that the infrastructure
//! layer implements, plus the session state machine, the registry, and the
//! manager facade the dispatch surface drives. It depends only on
//! `wagate-types` -- never on `wagate-engine` or any network crate.

pub mod engine;
pub mod manager;
pub mod registry;
pub mod session;
