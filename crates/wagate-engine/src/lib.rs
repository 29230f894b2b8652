//! Engine implementations for Wagate sessions.
//!
//! Implements the `ClientEngine`/`EngineFactory` ports defined in
//! `wagate-core`:
//!
//! - [`simulated`]: deterministic in-memory engine for development and tests
//! - [`remote`]: driver for an external engine daemon over HTTP + SSE
//! - [`factory`]: config-driven dispatch between the two
//! - [`config`]: `config.toml` loader and data-directory resolution

pub mod config;
pub mod factory;
pub mod remote;
pub mod simulated;

pub use config::{load_gateway_config, resolve_data_dir};
pub use factory::GatewayEngineFactory;
pub use remote::RemoteEngine;
pub use simulated::{SimulatedAuth, SimulatedEngine, SimulatedEngineFactory};
