use crate::elapsed::parse_etime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of one job node, inferred from its process at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum JobStatus {
    Completed = 0,
    /// Blocked on I/O redirection setup.
    Waiting = 1,
    Running = 2,
}

impl JobStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
        }
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JobStatus::Completed),
            1 => Ok(JobStatus::Waiting),
            2 => Ok(JobStatus::Running),
            other => Err(format!("unknown job status code {}", other)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The report a responder sends back for one discovery query.
///
/// Wire keys match the ones the web front end already reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    #[serde(rename = "vtf_name")]
    pub instance_name: String,
    #[serde(rename = "log_dir")]
    pub log_directory: String,
    #[serde(rename = "hostname")]
    pub host: String,
    #[serde(rename = "pid")]
    pub process_id: u32,
    /// Pipeline definition document, passed through untouched.
    #[serde(rename = "vtf_data")]
    pub definition_blob: String,
    pub nodes: BTreeMap<String, JobStatus>,
    #[serde(rename = "etime")]
    pub elapsed_time: String,
}

impl PipelineSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Elapsed time in seconds, if the reported string is well formed.
    pub fn elapsed_secs(&self) -> Option<u64> {
        parse_etime(&self.elapsed_time)
    }

    pub fn count_by_status(&self, status: JobStatus) -> usize {
        self.nodes.values().filter(|s| **s == status).count()
    }
}

/// Errors raised while encoding or decoding a snapshot datagram
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    TooLarge { size: usize, limit: usize },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "invalid snapshot payload: {}", e),
            SnapshotError::TooLarge { size, limit } => write!(
                f,
                "snapshot of {} bytes exceeds the datagram limit of {} bytes",
                size, limit
            ),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            SnapshotError::TooLarge { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Json(err)
    }
}
