//! Jobforge variable resolution and secret-taint engine.
//!
//! The store owns a job's variables in two views: `raw` (as declared)
//! and `expanded` (after recursive macro substitution). Tasks read
//! through [`VariableStore::get`] and the typed getters, write through
//! [`VariableStore::set`], and re-resolve macros with an explicit
//! [`VariableStore::recompute_expanded`]. Expansion is bounded (no
//! call-stack recursion, fixed max depth, cycle detection) and carries
//! a secret taint: any value derived from a secret becomes secret and
//! is registered with the masking registry before it can reach a log.
//!
//! ```
//! use std::sync::Arc;
//! use jf_mask::SecretMasker;
//! use jf_vars::{VariableStore, VariableValue};
//!
//! let seed = vec![
//!     ("greeting".to_string(), VariableValue::from("hello $(who)")),
//!     ("who".to_string(), VariableValue::from("world")),
//! ];
//! let (store, warnings) = VariableStore::new(Arc::new(SecretMasker::new()), seed);
//! assert!(warnings.is_empty());
//! assert_eq!(store.get("greeting").as_deref(), Some("hello world"));
//! ```

pub mod expand;
pub mod scope;
pub mod sensitive;
pub mod store;
pub mod variable;
pub mod wellknown;

pub use expand::{ExpansionWarning, MAX_DEPTH};
pub use scope::VariableScope;
pub use sensitive::{is_execution_sensitive, is_pii_variable};
pub use store::{identity_translator, SetOptions, Translator, VariableStore};
pub use variable::{Variable, VariableValue};
