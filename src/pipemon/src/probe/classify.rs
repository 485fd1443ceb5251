use super::ProcessProbe;
use pipemon_common::JobStatus;
use std::sync::Arc;
use tracing::{debug, trace};

/// Command-line markers left by the pipeline runner while a job is still wiring up its
/// standard streams.
pub const IO_MARKERS: [&str; 2] = ["STDIN:", "STDOUT:"];

/// Status of a live process judged from its command line alone.
pub fn classify_command_line(command_line: &str) -> JobStatus {
    if IO_MARKERS
        .iter()
        .any(|marker| command_line.contains(marker))
    {
        JobStatus::Waiting
    } else {
        JobStatus::Running
    }
}

/// Infers job status from the process table.
///
/// Known limitation: once a job exits, its pid may be reused by an unrelated process, which is
/// then reported as `Running` (or `Waiting`). Pid-based tracking cannot tell the two apart.
#[derive(Clone)]
pub struct StatusInferencer {
    probe: Arc<dyn ProcessProbe>,
}

impl StatusInferencer {
    pub fn new(probe: Arc<dyn ProcessProbe>) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &Arc<dyn ProcessProbe> {
        &self.probe
    }

    /// Any probe failure, including "not found", timeouts and a missing probe tool, yields
    /// `Completed`.
    pub async fn classify(&self, pid: u32) -> JobStatus {
        match self.probe.command_line(pid).await {
            Ok(command_line) => {
                let status = classify_command_line(&command_line);
                trace!("pid {} is {}: {}", pid, status, command_line);
                status
            }
            Err(e) if e.is_not_found() => JobStatus::Completed,
            Err(e) => {
                debug!("treating pid {} as completed: {}", pid, e);
                JobStatus::Completed
            }
        }
    }
}
