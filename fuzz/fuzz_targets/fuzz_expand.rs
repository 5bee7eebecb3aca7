//! Fuzz target for variable expansion.
//!
//! Seeds a store with arbitrary name/value pairs and recomputes; the
//! engine must never panic or overflow the stack, whatever the shape
//! of the reference graph.

#![no_main]

use std::sync::Arc;

use jf_mask::SecretMasker;
use jf_vars::{VariableStore, VariableValue};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|pairs: Vec<(String, String)>| {
    let seed = pairs
        .into_iter()
        .map(|(name, value)| (name, VariableValue::from(value)));
    let (store, _warnings) = VariableStore::new(Arc::new(SecretMasker::new()), seed);
    let _ = store.recompute_expanded();
});
