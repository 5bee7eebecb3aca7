//! The variable store: raw and expanded mappings with typed access.
//!
//! The store owns two maps keyed by the case-folded name: `raw` holds
//! values as declared, `expanded` holds the expansion engine's output
//! from the last recompute. `set` writes both maps immediately (a
//! directly set value is treated as already resolved), so `expanded`
//! can be stale with respect to macros inside newly set raw values
//! until [`VariableStore::recompute_expanded`] is called. That
//! staleness is intentional; expansion is never triggered implicitly.
//!
//! One coarse `RwLock` covers both maps and the translator, so a
//! recompute swaps the expanded map in as a single unit and no reader
//! ever observes a partially substituted view.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use jf_common::{is_well_known_read_only, Error, Result};
use jf_mask::SecretSink;
use tracing::{info, trace};
use uuid::Uuid;

use crate::expand::{expand_map, expand_once, ExpansionWarning};
use crate::scope::VariableScope;
use crate::variable::{fold_name, Variable, VariableValue};

/// The translation hook: a pure string transform applied at read time
/// (e.g. container path virtualization). Default is identity.
pub type Translator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The identity translator.
pub fn identity_translator() -> Translator {
    Arc::new(|value: &str| value.to_string())
}

/// Flags for [`VariableStore::set_with`].
///
/// `secret` and `read_only` are joins against the variable's current
/// state: they can promote a variable but never demote it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    pub secret: bool,
    pub read_only: bool,
    pub preserve_case: bool,
}

impl SetOptions {
    pub fn secret() -> Self {
        SetOptions {
            secret: true,
            ..Default::default()
        }
    }

    pub fn read_only() -> Self {
        SetOptions {
            read_only: true,
            ..Default::default()
        }
    }
}

struct Inner {
    raw: HashMap<String, Variable>,
    expanded: HashMap<String, Variable>,
    translator: Translator,
}

/// Variable state for one job.
pub struct VariableStore {
    inner: RwLock<Inner>,
    sink: Arc<dyn SecretSink>,
}

impl VariableStore {
    /// Build a store from orchestrator-supplied seed data and run the
    /// expansion engine once.
    ///
    /// Entries with blank names are dropped (logged, not fatal).
    /// Non-empty secret seed values are registered with the secret
    /// registry before expansion, so no secret predates its masker
    /// registration.
    pub fn new(
        sink: Arc<dyn SecretSink>,
        seed: impl IntoIterator<Item = (String, VariableValue)>,
    ) -> (Self, Vec<ExpansionWarning>) {
        let mut raw = HashMap::new();
        let mut dropped = 0usize;
        for (name, entry) in seed {
            if name.trim().is_empty() {
                dropped += 1;
                continue;
            }
            let value = entry.value.unwrap_or_default();
            if entry.secret && !value.is_empty() {
                sink.add_value(&value, &format!("store.seed:{name}"));
            }
            if let Ok(variable) =
                Variable::new(name, value, entry.secret, entry.read_only, false)
            {
                raw.insert(variable.folded_name(), variable);
            }
        }
        if dropped > 0 {
            info!(
                target: "jf_vars.store",
                dropped,
                "dropped seed variables with blank names"
            );
        }

        let translator = identity_translator();
        let translate = {
            let translator = translator.clone();
            move |value: &str| (translator)(value)
        };
        let (expanded, warnings) = expand_map(&raw, &translate, sink.as_ref());

        let store = VariableStore {
            inner: RwLock::new(Inner {
                raw,
                expanded,
                translator,
            }),
            sink,
        };
        (store, warnings)
    }

    /// Read a variable's expanded value, passed through the translator.
    ///
    /// Case-insensitive; `None` if the variable is missing. Missing is
    /// not an error.
    pub fn get(&self, name: &str) -> Option<String> {
        let inner = self.read_inner();
        let variable = inner.expanded.get(&fold_name(name))?;
        let value = (inner.translator)(variable.value());
        if variable.secret() {
            trace!(target: "jf_vars.store", name, "get (secret)");
        } else {
            trace!(target: "jf_vars.store", name, value = %value, "get");
        }
        Some(value)
    }

    /// Read a variable's expanded value without the translator.
    pub fn get_untranslated(&self, name: &str) -> Option<String> {
        let inner = self.read_inner();
        let variable = inner.expanded.get(&fold_name(name))?;
        Some(variable.value().to_string())
    }

    /// Parse a variable as `true`/`false` (case-insensitive, trimmed).
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        let value = self.get(name)?;
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Some(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name)?.trim().parse().ok()
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.trim().parse().ok()
    }

    pub fn get_uuid(&self, name: &str) -> Option<Uuid> {
        Uuid::parse_str(self.get(name)?.trim()).ok()
    }

    /// Parse a variable through any `FromStr` type (enums included).
    /// Parse failures come back as `None`, never as errors.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.trim().parse().ok()
    }

    /// Set a variable with default flags.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        self.set_with(name, value, SetOptions::default())
    }

    /// Set a variable.
    ///
    /// Writes both the raw and expanded maps immediately: a directly
    /// set value is treated as already fully resolved. `secret` and
    /// `read_only` join with the current expanded entry's flags, so a
    /// later non-secret `set` cannot demote a secret variable. A
    /// non-empty value that is (or stays) secret is registered with
    /// the secret registry before the write.
    pub fn set_with(&self, name: &str, value: &str, options: SetOptions) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::EmptyVariableName);
        }

        let mut inner = self.write_inner();
        let folded = fold_name(name);
        let current = inner.expanded.get(&folded);
        let secret = options.secret || current.is_some_and(Variable::secret);
        let read_only = options.read_only || current.is_some_and(Variable::read_only);

        if secret && !value.is_empty() {
            self.sink.add_value(value, &format!("store.set:{name}"));
        }

        let variable = Variable::new(name, value, secret, read_only, options.preserve_case)?;
        if secret {
            trace!(target: "jf_vars.store", name, "set (secret)");
        } else {
            trace!(target: "jf_vars.store", name, value, "set");
        }
        inner.raw.insert(folded.clone(), variable.clone());
        inner.expanded.insert(folded, variable);
        Ok(())
    }

    /// Remove a variable from both maps. Removing an absent name is a
    /// no-op; a blank name is an error.
    pub fn unset(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::EmptyVariableName);
        }
        let mut inner = self.write_inner();
        let folded = fold_name(name);
        inner.expanded.remove(&folded);
        inner.raw.remove(&folded);
        trace!(target: "jf_vars.store", name, "unset");
        Ok(())
    }

    /// Whether the variable is protected from ordinary job-level
    /// overwrite: its own flag, or membership in the process-wide
    /// read-only allowlist. Pure query; the store never enforces it.
    pub fn is_read_only(&self, name: &str) -> bool {
        let inner = self.read_inner();
        let folded = fold_name(name);
        let entry = inner
            .expanded
            .get(&folded)
            .or_else(|| inner.raw.get(&folded));
        match entry {
            Some(variable) => variable.read_only() || is_well_known_read_only(name),
            None => false,
        }
    }

    /// Re-run the expansion engine over the raw map.
    ///
    /// Holds the write lock for the whole pass and swaps the expanded
    /// map in as one unit. Depth and cycle conditions come back as
    /// warnings; affected variables keep their raw values.
    pub fn recompute_expanded(&self) -> Vec<ExpansionWarning> {
        let mut inner = self.write_inner();
        let translator = inner.translator.clone();
        let translate = move |value: &str| (translator)(value);
        let (expanded, warnings) = expand_map(&inner.raw, &translate, self.sink.as_ref());
        inner.expanded = expanded;
        warnings
    }

    /// Translated snapshot of the non-secret partition.
    pub fn public_variables(&self) -> Vec<Variable> {
        self.partition(false)
    }

    /// Translated snapshot of the secret partition.
    pub fn secret_variables(&self) -> Vec<Variable> {
        self.partition(true)
    }

    fn partition(&self, secret: bool) -> Vec<Variable> {
        let inner = self.read_inner();
        inner
            .expanded
            .values()
            .filter(|v| v.secret() == secret)
            .filter_map(|v| {
                Variable::new(
                    v.name(),
                    (inner.translator)(v.value()),
                    v.secret(),
                    v.read_only(),
                    v.preserve_case(),
                )
                .ok()
            })
            .collect()
    }

    /// Export the expanded set into `target` for the orchestrator
    /// reporting channel, applying `translation` to every value and
    /// marking the secret partition.
    pub fn copy_into(
        &self,
        target: &mut HashMap<String, VariableValue>,
        translation: impl Fn(&str) -> String,
    ) {
        for variable in self.public_variables() {
            target.insert(
                variable.name().to_string(),
                VariableValue::from(translation(variable.value())),
            );
        }
        for variable in self.secret_variables() {
            target.insert(
                variable.name().to_string(),
                VariableValue::new_secret(translation(variable.value())),
            );
        }
    }

    /// Install the translation hook applied at every read.
    pub fn set_translator(&self, translator: Translator) {
        self.write_inner().translator = translator;
    }

    /// Replace macros in a caller-owned value from the translated
    /// expanded map, one level deep. Unknown macros stay verbatim.
    pub fn expand_value(&self, value: &str) -> String {
        expand_once(&self.translated_source(), value)
    }

    /// Replace macros in every value of a caller-owned map, one level
    /// deep.
    pub fn expand_values(&self, target: &mut HashMap<String, String>) {
        let source = self.translated_source();
        for value in target.values_mut() {
            *value = expand_once(&source, value);
        }
    }

    /// Replace macros in every string of a JSON document, one level
    /// deep (task inputs arrive as JSON).
    pub fn expand_json(&self, value: &mut serde_json::Value) {
        let source = self.translated_source();
        expand_json_value(&source, value);
    }

    /// Open a scope overlay; variables set through it are removed from
    /// the store when the scope is dropped.
    pub fn scope(&self) -> VariableScope<'_> {
        VariableScope::new(self)
    }

    fn translated_source(&self) -> HashMap<String, String> {
        let inner = self.read_inner();
        inner
            .expanded
            .values()
            .map(|v| (v.folded_name(), (inner.translator)(v.value())))
            .collect()
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        // A poisoned lock still holds consistent state: every mutation
        // completes its map writes before releasing the guard.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn expand_json_value(source: &HashMap<String, String>, value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = expand_once(source, s),
        serde_json::Value::Array(items) => {
            for item in items {
                expand_json_value(source, item);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                expand_json_value(source, item);
            }
        }
        _ => {}
    }
}
