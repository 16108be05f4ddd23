//! Job domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Environment variable carrying the target reference to the remote job
pub const TARGET_REFERENCE_VAR: &str = "REPOSITORY_URL";
/// Environment variable carrying the destination location to the remote job
pub const DESTINATION_VAR: &str = "OUTPUT_BUCKET";
/// Environment variable carrying the job id to the remote job
pub const JOB_ID_VAR: &str = "JOB_ID";

/// Reasons a job specification is rejected before submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("target reference cannot be empty")]
    EmptyTarget,

    #[error("destination location cannot be empty")]
    EmptyDestination,

    #[error("job id cannot be empty")]
    EmptyJobId,

    #[error("job id '{0}' must not contain '/'")]
    InvalidJobId(String),
}

/// Description of one job request
///
/// The `job_id` namespaces the job's artifacts under the destination, so a
/// spec must never be resubmitted with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    target_reference: String,
    destination_location: String,
    job_id: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
}

impl JobSpec {
    /// Creates a job spec with a caller-chosen id
    pub fn new(
        target_reference: impl Into<String>,
        destination_location: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let target_reference = target_reference.into();
        let destination_location = destination_location.into();
        let job_id = job_id.into();

        if target_reference.trim().is_empty() {
            return Err(SpecError::EmptyTarget);
        }
        if destination_location.trim().is_empty() {
            return Err(SpecError::EmptyDestination);
        }
        if job_id.trim().is_empty() {
            return Err(SpecError::EmptyJobId);
        }
        if job_id.contains('/') {
            return Err(SpecError::InvalidJobId(job_id));
        }

        Ok(Self {
            target_reference,
            destination_location,
            job_id,
            parameters: HashMap::new(),
        })
    }

    /// Creates a job spec with a freshly generated id
    ///
    /// The id has the form `{prefix}-{YYYYmmdd-HHMMSS}-{8 hex chars}`.
    pub fn generate(
        target_reference: impl Into<String>,
        destination_location: impl Into<String>,
        job_prefix: &str,
    ) -> Result<Self, SpecError> {
        Self::new(
            target_reference,
            destination_location,
            generate_job_id(job_prefix),
        )
    }

    /// Adds a pass-through parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Adds several pass-through parameters
    pub fn with_parameters<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn target_reference(&self) -> &str {
        &self.target_reference
    }

    pub fn destination_location(&self) -> &str {
        &self.destination_location
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// Remote prefix the job's artifact tree is written under
    pub fn artifact_prefix(&self) -> String {
        artifact_prefix(&self.destination_location, &self.job_id)
    }

    /// Variables handed to the remote job
    ///
    /// The target, destination and job id always win over parameters with
    /// the same names.
    pub fn environment_overrides(&self) -> HashMap<String, String> {
        let mut env = self.parameters.clone();
        env.insert(
            TARGET_REFERENCE_VAR.to_string(),
            self.target_reference.clone(),
        );
        env.insert(DESTINATION_VAR.to_string(), self.destination_location.clone());
        env.insert(JOB_ID_VAR.to_string(), self.job_id.clone());
        env
    }
}

/// Builds the artifact prefix for a destination and job id
///
/// Used directly when resuming a job whose spec is no longer in memory.
pub fn artifact_prefix(destination_location: &str, job_id: &str) -> String {
    format!("{}/{}/", destination_location.trim_end_matches('/'), job_id)
}

/// Generates a unique job id from a human-readable prefix
pub fn generate_job_id(prefix: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let prefix = prefix.trim_matches('-');

    if prefix.is_empty() {
        format!("{}-{}", timestamp, &suffix[..8])
    } else {
        format!("{}-{}-{}", prefix, timestamp, &suffix[..8])
    }
}

/// Opaque identifier issued by the execution service on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
