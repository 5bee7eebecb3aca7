//! Well-known variable names and macro delimiter tokens.
//!
//! Variable names are case-insensitive. The constants here are the
//! canonical lowercase spellings the orchestrator uses when it seeds a
//! job; lookups elsewhere fold names before comparing, so casing in
//! job definitions does not matter.
//!
//! Do not add file path variables to these namespaces. Path variables
//! are owned by the execution context so container path translation
//! can rewrite them.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Token opening an embedded variable reference inside a value.
pub const MACRO_PREFIX: &str = "$(";

/// Token closing an embedded variable reference.
pub const MACRO_SUFFIX: &str = ")";

/// Variables describing the agent process and its connection.
pub mod agent {
    pub const NAME: &str = "agent.name";
    pub const MACHINE_NAME: &str = "agent.machine_name";
    pub const JOB_STATUS: &str = "agent.job_status";
    pub const PROXY_URL: &str = "agent.proxy_url";
    pub const PROXY_USERNAME: &str = "agent.proxy_username";
    pub const PROXY_PASSWORD: &str = "agent.proxy_password";
    /// Feature toggle: whether the worker rejects job-level writes to
    /// read-only variables. The store itself never enforces this.
    pub const ENFORCE_READ_ONLY: &str = "agent.enforce_read_only";
}

/// Variables describing the orchestrator-side plan and job identity.
pub mod system {
    pub const DEBUG: &str = "system.debug";
    pub const PLAN_ID: &str = "system.plan_id";
    pub const DEFINITION_ID: &str = "system.definition_id";
    pub const JOB_ID: &str = "system.job_id";
    pub const JOB_NAME: &str = "system.job_name";
    pub const JOB_ATTEMPT: &str = "system.job_attempt";
    pub const JOB_DISPLAY_NAME: &str = "system.job_display_name";
    pub const STAGE_NAME: &str = "system.stage_name";
    pub const STAGE_ATTEMPT: &str = "system.stage_attempt";
    pub const STAGE_DISPLAY_NAME: &str = "system.stage_display_name";
}

/// Variables describing the build being executed.
pub mod build {
    pub const ID: &str = "build.id";
    pub const NUMBER: &str = "build.number";
    pub const CONTAINER_ID: &str = "build.container_id";
    pub const DEFINITION_NAME: &str = "build.definition_name";
    pub const SOURCE_BRANCH: &str = "build.source_branch";
    pub const SOURCE_VERSION: &str = "build.source_version";
    pub const SOURCE_VERSION_AUTHOR: &str = "build.source_version_author";
    pub const SOURCE_VERSION_MESSAGE: &str = "build.source_version_message";
    pub const REQUESTED_FOR: &str = "build.requested_for";
    pub const REQUESTED_FOR_EMAIL: &str = "build.requested_for_email";
    pub const QUEUED_BY: &str = "build.queued_by";
}

/// Variables describing the release being deployed.
pub mod release {
    pub const ID: &str = "release.id";
    pub const NAME: &str = "release.name";
    pub const DEFINITION_NAME: &str = "release.definition_name";
    pub const ENVIRONMENT_NAME: &str = "release.environment_name";
    pub const REQUESTED_FOR: &str = "release.requested_for";
    pub const REQUESTED_FOR_EMAIL: &str = "release.requested_for_email";
}

/// Orchestrator-owned variables protected from ordinary job-level
/// overwrite regardless of per-variable flags.
///
/// These are identity and plumbing values populated by the server; a
/// task overwriting `build.id` mid-job would corrupt every downstream
/// consumer. Callers combine this set with the per-variable read-only
/// flag via `is_read_only` on the store.
static READ_ONLY_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        agent::NAME,
        agent::MACHINE_NAME,
        agent::JOB_STATUS,
        system::PLAN_ID,
        system::DEFINITION_ID,
        system::JOB_ID,
        system::JOB_NAME,
        system::JOB_ATTEMPT,
        system::JOB_DISPLAY_NAME,
        system::STAGE_NAME,
        system::STAGE_ATTEMPT,
        system::STAGE_DISPLAY_NAME,
        build::ID,
        build::NUMBER,
        build::CONTAINER_ID,
        build::DEFINITION_NAME,
        build::SOURCE_BRANCH,
        build::SOURCE_VERSION,
        build::REQUESTED_FOR,
        build::REQUESTED_FOR_EMAIL,
        build::QUEUED_BY,
        release::ID,
        release::NAME,
        release::DEFINITION_NAME,
        release::REQUESTED_FOR,
        release::REQUESTED_FOR_EMAIL,
    ])
});

/// Whether `name` is in the process-wide read-only allowlist.
///
/// Case-insensitive; does not consult any per-variable flag.
pub fn is_well_known_read_only(name: &str) -> bool {
    READ_ONLY_NAMES.contains(name.to_lowercase().as_str())
}
