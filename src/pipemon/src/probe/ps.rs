use super::{ProbeError, ProcessProbe};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::trace;

/// Probe backed by the `ps` utility. Every invocation is bounded by `timeout` and the child is
/// killed if it overruns.
#[derive(Debug, Clone)]
pub struct PsProbe {
    program: PathBuf,
    timeout: Duration,
}

impl PsProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("ps"),
            timeout,
        }
    }

    #[cfg(test)]
    fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Runs `ps -p <pid> -o <field>=` and returns the trimmed value.
    async fn field(&self, pid: u32, field: &str) -> Result<String, ProbeError> {
        let mut command = Command::new(&self.program);
        command
            .args(["-p", &pid.to_string(), "-o", &format!("{}=", field)])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ProbeError::Timeout {
                    pid,
                    after: self.timeout,
                })
            }
        };
        trace!("ps -p {} -o {}= exited with {}", pid, field, output.status);

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            // ps exits non-zero without a diagnostic when the pid is not in the table
            return if stderr.is_empty() {
                Err(ProbeError::NotFound { pid })
            } else {
                Err(ProbeError::ToolFailed {
                    pid,
                    detail: stderr,
                })
            };
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| ProbeError::MalformedOutput {
            pid,
            output: String::from_utf8_lossy(e.as_bytes()).to_string(),
        })?;
        let value = stdout.trim();
        if value.is_empty() {
            return Err(ProbeError::NotFound { pid });
        }
        Ok(value.to_string())
    }
}

#[async_trait]
impl ProcessProbe for PsProbe {
    async fn command_line(&self, pid: u32) -> Result<String, ProbeError> {
        self.field(pid, "command").await
    }

    async fn elapsed_time(&self, pid: u32) -> Result<String, ProbeError> {
        self.field(pid, "etime").await
    }
}
