//! Variable value objects.

use std::fmt;

use jf_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single job variable: name, resolved value, and flags.
///
/// Immutable once constructed; the store replaces whole `Variable`
/// entries rather than mutating them in place. Identity is the
/// case-folded name; the original casing is retained for display.
#[derive(Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    value: String,
    secret: bool,
    read_only: bool,
    preserve_case: bool,
}

impl Variable {
    /// Create a variable. The name must not be blank.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        secret: bool,
        read_only: bool,
        preserve_case: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyVariableName);
        }
        Ok(Variable {
            name,
            value: value.into(),
            secret,
            read_only,
            preserve_case,
        })
    }

    /// The name as originally declared (display casing).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The case-folded name used as map identity.
    pub fn folded_name(&self) -> String {
        fold_name(&self.name)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn secret(&self) -> bool {
        self.secret
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Display-only hint: keep the declared casing when exporting the
    /// name into casing-sensitive surfaces (e.g. environment blocks).
    pub fn preserve_case(&self) -> bool {
        self.preserve_case
    }
}

// Debug is a diagnostic path; a secret value must not ride through it.
impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field(
                "value",
                if self.secret { &"<redacted>" } else { &self.value },
            )
            .field("secret", &self.secret)
            .field("read_only", &self.read_only)
            .field("preserve_case", &self.preserve_case)
            .finish()
    }
}

/// The seed/export record for one variable, as it appears in
/// orchestrator job messages and in bulk exports.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Missing values are coerced to the empty string on load.
    pub value: Option<String>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl VariableValue {
    /// A secret value, for export of the private partition.
    pub fn new_secret(value: impl Into<String>) -> Self {
        VariableValue {
            value: Some(value.into()),
            secret: true,
            read_only: false,
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue {
            value: Some(value.to_string()),
            secret: false,
            read_only: false,
        }
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue {
            value: Some(value),
            secret: false,
            read_only: false,
        }
    }
}

impl fmt::Debug for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableValue")
            .field(
                "value",
                if self.secret { &"<redacted>" } else { &self.value },
            )
            .field("secret", &self.secret)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Case-fold a variable name for map identity.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_lowercase()
}
