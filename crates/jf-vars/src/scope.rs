//! Scope overlay: a temporary extension of the store.
//!
//! A scope records every name set through it and unsets those names
//! from the store when dropped, on every exit path including unwinds.
//! It does not save or restore prior values: overlay-add is
//! destructive with respect to pre-existing state, by design.

use jf_common::Result;

use crate::store::{SetOptions, VariableStore};
use crate::variable::fold_name;

/// RAII overlay over a [`VariableStore`]; see the module docs.
pub struct VariableScope<'a> {
    store: &'a VariableStore,
    names: Vec<String>,
}

impl<'a> VariableScope<'a> {
    pub(crate) fn new(store: &'a VariableStore) -> Self {
        VariableScope {
            store,
            names: Vec::new(),
        }
    }

    /// Set a variable with default flags, recording it for removal.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.set_with(name, value, SetOptions::default())
    }

    /// Set a variable, recording it for removal when the scope drops.
    /// Names are recorded only on a successful set.
    pub fn set_with(&mut self, name: &str, value: &str, options: SetOptions) -> Result<()> {
        self.store.set_with(name, value, options)?;
        let folded = fold_name(name);
        if !self.names.contains(&folded) {
            self.names.push(folded);
        }
        Ok(())
    }
}

impl Drop for VariableScope<'_> {
    fn drop(&mut self) {
        for name in &self.names {
            // Recorded names are never blank, so unset cannot fail.
            let _ = self.store.unset(name);
        }
    }
}
