//! Typed accessors for well-known variables.
//!
//! Thin wrappers over the store's getters using the canonical names
//! from `jf_common::names`, so callers never spell a dotted name by
//! hand. All file path variables are deliberately absent: paths are
//! owned by the execution context for container translation.

use jf_common::names::{agent, build, system};
use jf_common::{JobStatus, Result};
use uuid::Uuid;

use crate::store::VariableStore;

impl VariableStore {
    /// Current job status, if a task has reported one.
    pub fn job_status(&self) -> Option<JobStatus> {
        self.get_parsed(agent::JOB_STATUS)
    }

    pub fn set_job_status(&self, status: JobStatus) -> Result<()> {
        self.set(agent::JOB_STATUS, &status.to_string())
    }

    /// Whether the job runs with verbose diagnostics.
    pub fn system_debug(&self) -> bool {
        self.get_bool(system::DEBUG).unwrap_or(false)
    }

    /// Whether the worker rejects job-level writes to read-only
    /// variables. Consulted by callers; the store never enforces it.
    pub fn enforce_read_only(&self) -> bool {
        self.get_bool(agent::ENFORCE_READ_ONLY).unwrap_or(false)
    }

    pub fn plan_id(&self) -> Option<Uuid> {
        self.get_uuid(system::PLAN_ID)
    }

    pub fn job_id(&self) -> Option<String> {
        self.get(system::JOB_ID)
    }

    pub fn job_display_name(&self) -> Option<String> {
        self.get(system::JOB_DISPLAY_NAME)
    }

    pub fn job_attempt(&self) -> Option<i32> {
        self.get_i32(system::JOB_ATTEMPT)
    }

    pub fn build_id(&self) -> Option<i32> {
        self.get_i32(build::ID)
    }

    pub fn build_container_id(&self) -> Option<i64> {
        self.get_i64(build::CONTAINER_ID)
    }

    pub fn build_number(&self) -> Option<String> {
        self.get(build::NUMBER)
    }

    pub fn build_source_branch(&self) -> Option<String> {
        self.get(build::SOURCE_BRANCH)
    }

    pub fn proxy_url(&self) -> Option<String> {
        self.get(agent::PROXY_URL)
    }

    pub fn proxy_username(&self) -> Option<String> {
        self.get(agent::PROXY_USERNAME)
    }

    pub fn proxy_password(&self) -> Option<String> {
        self.get(agent::PROXY_PASSWORD)
    }
}
