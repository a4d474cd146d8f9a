//! Review orchestration over the gateway link.
//!
//! Provides the submission pipeline: request envelope construction,
//! the `submit` entry point that drives a request from registration to a
//! terminal state, and majority-rule aggregation of the collected verdicts.

pub mod aggregate;
pub mod pipeline;
pub mod prompt;
