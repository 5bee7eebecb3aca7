//! Jobforge shared types and constants.
//!
//! This crate provides the small foundation shared by the worker's
//! variable-handling crates:
//! - Common error types
//! - Well-known variable names and the macro delimiter tokens
//! - The job status enum carried in `agent.job_status`

pub mod error;
pub mod names;
pub mod status;

pub use error::{Error, Result};
pub use names::{is_well_known_read_only, MACRO_PREFIX, MACRO_SUFFIX};
pub use status::JobStatus;
