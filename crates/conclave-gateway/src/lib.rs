//! Connection plumbing for the remote multi-agent review gateway.
//!
//! This crate owns the request-orchestration core:
//! - [`auth`] — gateway authentication tokens
//! - [`protocol`] — wire frames and the fixed agent roster
//! - [`correlation`] — the pending-request table that demultiplexes
//!   asynchronous responses back to their callers
//! - [`link`] — the persistent WebSocket connection and its reader task
//!
//! The flow: a caller registers a request id in the [`CorrelationTable`],
//! sends a framed request through the [`GatewayLink`], and suspends on a
//! [`VerdictWaiter`]. The link's reader task pushes every inbound frame into
//! the table; when all expected agents have completed, the waiter resolves.

pub mod auth;
pub mod correlation;
pub mod link;
pub mod protocol;

pub use correlation::{CorrelationTable, VerdictWaiter};
pub use link::GatewayLink;
pub use protocol::{ReviewRequestFrame, EXPECTED_VERDICTS};
