//! Process-table probes and the job status inference built on top of them.
mod classify;
mod process_table;
mod ps;

pub use classify::{classify_command_line, StatusInferencer, IO_MARKERS};
pub use process_table::ProcessTableProbe;
pub use ps::PsProbe;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Read-only view of the OS process table.
#[automock]
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// Full command line of a live process.
    async fn command_line(&self, pid: u32) -> Result<String, ProbeError>;

    /// Elapsed running time of a live process, rendered as `[[D-]HH:]MM:SS`.
    async fn elapsed_time(&self, pid: u32) -> Result<String, ProbeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeBackend {
    /// Shells out to `ps`.
    #[default]
    Ps,
    /// Reads the process table in-process.
    Sysinfo,
}

impl ProbeBackend {
    pub fn build(self, timeout: Duration) -> Arc<dyn ProcessProbe> {
        match self {
            ProbeBackend::Ps => Arc::new(PsProbe::new(timeout)),
            ProbeBackend::Sysinfo => Arc::new(ProcessTableProbe::new(timeout)),
        }
    }
}

/// Failure to read a process entry.
///
/// Callers that only care about job status collapse every variant to "completed"; the
/// distinction exists for logging.
#[derive(Debug)]
pub enum ProbeError {
    /// No live process with this pid.
    NotFound { pid: u32 },

    /// The probe tool could not be started.
    Spawn(io::Error),

    /// The probe tool ran but reported a failure.
    ToolFailed { pid: u32, detail: String },

    /// The probe did not answer in time.
    Timeout { pid: u32, after: Duration },

    /// The probe answered with something unreadable.
    MalformedOutput { pid: u32, output: String },
}

impl ProbeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound { .. })
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::NotFound { pid } => write!(f, "process {} not found", pid),
            ProbeError::Spawn(e) => write!(f, "failed to run process probe: {}", e),
            ProbeError::ToolFailed { pid, detail } => {
                write!(f, "process probe failed for pid {}: {}", pid, detail)
            }
            ProbeError::Timeout { pid, after } => {
                write!(f, "process probe for pid {} timed out after {:?}", pid, after)
            }
            ProbeError::MalformedOutput { pid, output } => {
                write!(f, "unreadable probe output for pid {}: {:?}", pid, output)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        ProbeError::Spawn(err)
    }
}
