use super::{ProbeError, ProcessProbe};
use async_trait::async_trait;
use pipemon_common::elapsed::format_etime;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::sync::RwLock;

/// Probe that reads the process table in-process through `sysinfo` instead of spawning `ps`.
pub struct ProcessTableProbe {
    system: Arc<RwLock<System>>,
    timeout: Duration,
}

impl ProcessTableProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            system: Arc::new(RwLock::new(System::new())),
            timeout,
        }
    }

    /// Refreshes the entry for `pid` and reads a value out of it.
    ///
    /// The refresh is blocking, so it runs on the blocking pool.
    async fn lookup<T, F>(&self, pid: u32, read: F) -> Result<T, ProbeError>
    where
        T: Send + 'static,
        F: FnOnce(&Process) -> T + Send + 'static,
    {
        let system = Arc::clone(&self.system);
        let task = tokio::task::spawn_blocking(move || {
            let mut sys = system.blocking_write();
            let target = Pid::from_u32(pid);

            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[target]),
                true,
                ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
            );
            sys.process(target).map(read)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Some(value))) => Ok(value),
            Ok(Ok(None)) => Err(ProbeError::NotFound { pid }),
            Ok(Err(join_error)) => Err(ProbeError::ToolFailed {
                pid,
                detail: join_error.to_string(),
            }),
            Err(_) => Err(ProbeError::Timeout {
                pid,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl ProcessProbe for ProcessTableProbe {
    async fn command_line(&self, pid: u32) -> Result<String, ProbeError> {
        let argv = self
            .lookup(pid, |process| {
                process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().to_string())
                    .collect::<Vec<_>>()
            })
            .await?;

        // kernel threads and zombies have no argv
        if argv.is_empty() {
            return Err(ProbeError::MalformedOutput {
                pid,
                output: String::new(),
            });
        }
        Ok(argv.join(" "))
    }

    async fn elapsed_time(&self, pid: u32) -> Result<String, ProbeError> {
        let secs = self.lookup(pid, |process| process.run_time()).await?;
        Ok(format_etime(secs))
    }
}
