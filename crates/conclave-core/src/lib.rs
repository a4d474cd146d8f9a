//! Core types, configuration, and error handling for the Conclave platform.
//!
//! This crate provides the shared foundation used by all other Conclave
//! crates:
//! - [`ConclaveError`] — unified error type using `thiserror`
//! - [`ConclaveConfig`] — configuration loaded from `.conclave.toml`
//! - Shared types: [`Decision`], [`AgentVerdict`], [`ReviewVerdict`]

mod config;
mod error;
mod types;

pub use config::{ConclaveConfig, GatewayConfig, ReviewConfig};
pub use error::ConclaveError;
pub use types::{AgentVerdict, Decision, ReviewVerdict};

/// A convenience `Result` type for Conclave operations.
pub type Result<T> = std::result::Result<T, ConclaveError>;
