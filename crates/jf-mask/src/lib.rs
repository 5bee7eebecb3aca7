//! Secret value registry and log masking for the jobforge worker.
//!
//! Two pieces:
//! - [`SecretMasker`]: the process-wide registry of sensitive strings,
//!   with occurrence masking over arbitrary text. The variable store
//!   feeds it through the [`SecretSink`] seam.
//! - [`MaskingLayer`]: a `tracing` layer that masks every string field
//!   through the registry before a log line is written.

pub mod error;
pub mod layer;
pub mod masker;

pub use error::{MaskError, Result};
pub use layer::{init_masked_logging, MaskingLayer};
pub use masker::{SecretMasker, SecretSink, MASK_REPLACEMENT, MIN_SECRET_LENGTH};
