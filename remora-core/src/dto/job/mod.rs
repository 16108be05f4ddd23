//! Job DTOs for the execution service

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::job::{JobHandle, JobSpec};
use crate::domain::status::JobStatus;

/// Request to start a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub target_reference: String,
    pub destination_location: String,
    pub job_id: String,
    /// Variables made available to the remote job
    pub parameters: HashMap<String, String>,
}

impl From<&JobSpec> for SubmitJobRequest {
    fn from(spec: &JobSpec) -> Self {
        Self {
            target_reference: spec.target_reference().to_string(),
            destination_location: spec.destination_location().to_string(),
            job_id: spec.job_id().to_string(),
            parameters: spec.environment_overrides(),
        }
    }
}

/// Response to a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub handle: JobHandle,
}

/// Current state of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeJobResponse {
    pub handle: JobHandle,
    pub status: JobStatus,
    /// Free-form phase name reported by the service, if any
    #[serde(default)]
    pub phase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_carries_environment() {
        let spec = JobSpec::new("https://git.example/repo", "bucket", "job-1")
            .unwrap()
            .with_parameter("DEPTH", "full");

        let req = SubmitJobRequest::from(&spec);
        assert_eq!(req.job_id, "job-1");
        assert_eq!(req.parameters.get("DEPTH"), Some(&"full".to_string()));
        assert_eq!(req.parameters.get("JOB_ID"), Some(&"job-1".to_string()));
    }

    #[test]
    fn test_describe_response_tolerates_missing_phase() {
        let resp: DescribeJobResponse =
            serde_json::from_str(r#"{"handle":"b-1","status":"IN_PROGRESS"}"#).unwrap();
        assert_eq!(resp.status, JobStatus::InProgress);
        assert!(resp.phase.is_none());
    }
}
