//! Job status domain type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote job status as reported by the execution service
///
/// `Unknown` is what a caller records when the status query itself failed or
/// the service answered with a state this crate does not know. It is never
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    #[serde(alias = "FAULT")]
    Faulted,
    Stopped,
    TimedOut,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the remote service will never move the job out of this state
    pub fn is_terminal(&self) -> bool {
        match self {
            JobStatus::Succeeded
            | JobStatus::Failed
            | JobStatus::Faulted
            | JobStatus::Stopped
            | JobStatus::TimedOut => true,
            JobStatus::Pending | JobStatus::InProgress | JobStatus::Unknown => false,
        }
    }

    /// Whether this is an authoritative negative outcome
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::Faulted | JobStatus::Stopped | JobStatus::TimedOut
        )
    }

    /// Wire representation (e.g. `IN_PROGRESS`)
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Faulted => "FAULTED",
            JobStatus::Stopped => "STOPPED",
            JobStatus::TimedOut => "TIMED_OUT",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "PENDING" | "QUEUED" | "SUBMITTED" => Ok(JobStatus::Pending),
            "IN_PROGRESS" | "INPROGRESS" | "RUNNING" => Ok(JobStatus::InProgress),
            "SUCCEEDED" => Ok(JobStatus::Succeeded),
            "FAILED" => Ok(JobStatus::Failed),
            "FAULTED" | "FAULT" => Ok(JobStatus::Faulted),
            "STOPPED" => Ok(JobStatus::Stopped),
            "TIMED_OUT" | "TIMEDOUT" => Ok(JobStatus::TimedOut),
            "UNKNOWN" => Ok(JobStatus::Unknown),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Faulted.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_succeeded_is_not_failure() {
        assert!(!JobStatus::Succeeded.is_failure());
        assert!(!JobStatus::Unknown.is_failure());
        assert!(JobStatus::TimedOut.is_failure());
    }

    #[test]
    fn test_deserialize_wire_names() {
        let status: JobStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, JobStatus::InProgress);

        let status: JobStatus = serde_json::from_str("\"FAULT\"").unwrap();
        assert_eq!(status, JobStatus::Faulted);

        let status: JobStatus = serde_json::from_str("\"TIMED_OUT\"").unwrap();
        assert_eq!(status, JobStatus::TimedOut);
    }

    #[test]
    fn test_unrecognized_wire_status_is_unknown() {
        let status: JobStatus = serde_json::from_str("\"QUEUED_FOR_REVIEW\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
    }

    #[test]
    fn test_serialize_uses_wire_name() {
        assert_eq!(
            serde_json::to_string(&JobStatus::TimedOut).unwrap(),
            "\"TIMED_OUT\""
        );
    }

    #[test]
    fn test_from_str_is_lenient() {
        assert_eq!("in-progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!(" Succeeded ".parse::<JobStatus>(), Ok(JobStatus::Succeeded));
        assert_eq!("fault".parse::<JobStatus>(), Ok(JobStatus::Faulted));
        assert!("bogus".parse::<JobStatus>().is_err());
    }
}
