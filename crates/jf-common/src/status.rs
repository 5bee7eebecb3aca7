//! Job completion status, as carried in the `agent.job_status` variable.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a job, reported back to the orchestrator and visible to
/// later tasks through `agent.job_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    SucceededWithIssues,
    Failed,
    Canceled,
    Skipped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Succeeded => "Succeeded",
            JobStatus::SucceededWithIssues => "SucceededWithIssues",
            JobStatus::Failed => "Failed",
            JobStatus::Canceled => "Canceled",
            JobStatus::Skipped => "Skipped",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    /// Case-insensitive parse; whitespace around the token is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "succeeded" => Ok(JobStatus::Succeeded),
            "succeededwithissues" => Ok(JobStatus::SucceededWithIssues),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            "skipped" => Ok(JobStatus::Skipped),
            _ => Err(Error::UnknownJobStatus(s.to_string())),
        }
    }
}

impl JobStatus {
    /// Whether the job reached the end of its task list, with or
    /// without issues.
    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::SucceededWithIssues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for status in [
            JobStatus::Succeeded,
            JobStatus::SucceededWithIssues,
            JobStatus::Failed,
            JobStatus::Canceled,
            JobStatus::Skipped,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("succeeded".parse::<JobStatus>().unwrap(), JobStatus::Succeeded);
        assert_eq!("FAILED".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert_eq!(
            " SucceededWithIssues ".parse::<JobStatus>().unwrap(),
            JobStatus::SucceededWithIssues
        );
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "exploded".parse::<JobStatus>().unwrap_err();
        assert_eq!(err, Error::UnknownJobStatus("exploded".into()));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&JobStatus::SucceededWithIssues).unwrap();
        assert_eq!(json, "\"succeeded_with_issues\"");
    }

    #[test]
    fn test_is_completed() {
        assert!(JobStatus::Succeeded.is_completed());
        assert!(JobStatus::SucceededWithIssues.is_completed());
        assert!(!JobStatus::Failed.is_completed());
        assert!(!JobStatus::Canceled.is_completed());
    }
}
