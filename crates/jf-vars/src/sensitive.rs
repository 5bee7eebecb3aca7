//! Sensitivity registries: static name sets, no enforcement.
//!
//! Two process-wide, read-only sets of variable names: those carrying
//! personally identifying data, and those unsafe to interpolate into
//! command execution without extra escaping. Callers outside this
//! core (telemetry scrubbing, command builders) consult them; the
//! store itself never acts on membership.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use jf_common::names::{agent, build, release, system};

/// Variable names known to carry personally identifying data.
static PII_VARIABLE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        build::QUEUED_BY,
        build::REQUESTED_FOR,
        build::REQUESTED_FOR_EMAIL,
        build::SOURCE_BRANCH,
        build::SOURCE_VERSION,
        build::SOURCE_VERSION_AUTHOR,
        release::REQUESTED_FOR,
        release::REQUESTED_FOR_EMAIL,
    ])
});

/// Per-artifact variables are named `release.artifacts.{alias}.{suffix}`;
/// these suffixes carry PII for any alias.
const PII_ARTIFACT_PREFIX: &str = "release.artifacts.";

const PII_ARTIFACT_SUFFIXES: &[&str] = &[
    ".source_branch",
    ".source_version",
    ".requested_for",
];

/// Variable names unsafe to interpolate into command execution
/// without extra escaping: their values are free-form text authored
/// by users (commit messages, display names, machine names).
static EXECUTION_SENSITIVE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        agent::NAME,
        agent::MACHINE_NAME,
        build::DEFINITION_NAME,
        build::SOURCE_VERSION_AUTHOR,
        build::SOURCE_VERSION_MESSAGE,
        system::JOB_DISPLAY_NAME,
        system::STAGE_DISPLAY_NAME,
        release::DEFINITION_NAME,
        release::ENVIRONMENT_NAME,
    ])
});

/// Whether `name` is known to carry personally identifying data.
/// Case-insensitive.
pub fn is_pii_variable(name: &str) -> bool {
    let folded = name.to_lowercase();
    if PII_VARIABLE_NAMES.contains(folded.as_str()) {
        return true;
    }
    folded.starts_with(PII_ARTIFACT_PREFIX)
        && PII_ARTIFACT_SUFFIXES
            .iter()
            .any(|suffix| folded.ends_with(suffix))
}

/// Whether `name` is unsafe to interpolate into command execution.
/// Case-insensitive.
pub fn is_execution_sensitive(name: &str) -> bool {
    EXECUTION_SENSITIVE_NAMES.contains(name.to_lowercase().as_str())
}
