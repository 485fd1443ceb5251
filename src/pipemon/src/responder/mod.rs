//! The responder embedded in every running pipeline. It answers each discovery query with a
//! freshly built [`PipelineSnapshot`].
mod log_scan;

pub use log_scan::{scan_log_directory, LogFileRecord};

use crate::definition::PipelineDefinition;
use crate::probe::{ProcessProbe, StatusInferencer};
use crate::transport::Transport;
use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use pipemon_common::constants::{MAX_DATAGRAM_PAYLOAD, QUERY_BUFFER_SIZE};
use pipemon_common::elapsed::format_etime;
use pipemon_common::{JobStatus, PipelineSnapshot, SnapshotError};
use std::collections::BTreeMap;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Identity of the pipeline instance, fixed at startup.
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub instance_name: String,
    pub log_directory: PathBuf,
    pub definition_blob: String,
    pub host: String,
    pub process_id: u32,
}

impl ResponderSettings {
    /// Validates the log directory and reads host name and pid from the OS.
    pub fn from_environment(definition: &PipelineDefinition, log_directory: &Path) -> Result<Self> {
        let log_directory = log_directory
            .canonicalize()
            .with_context(|| format!("log directory {:?} does not exist", log_directory))?;
        fs::read_dir(&log_directory)
            .with_context(|| format!("log directory {:?} is not readable", log_directory))?;

        let host = nix::unistd::gethostname()
            .context("failed to read host name")?
            .to_string_lossy()
            .to_string();

        Ok(Self {
            instance_name: definition.instance_name(),
            log_directory,
            definition_blob: definition.blob().to_string(),
            host,
            process_id: std::process::id(),
        })
    }
}

pub struct Responder<T> {
    settings: ResponderSettings,
    transport: T,
    inferencer: StatusInferencer,
    group: Ipv4Addr,
    probe_concurrency: usize,
    started_at: Instant,
    cancellation_token: CancellationToken,
}

impl<T: Transport> Responder<T> {
    pub fn new(
        settings: ResponderSettings,
        transport: T,
        probe: Arc<dyn ProcessProbe>,
        group: Ipv4Addr,
        probe_concurrency: usize,
    ) -> Self {
        Self {
            settings,
            transport,
            inferencer: StatusInferencer::new(probe),
            group,
            probe_concurrency: probe_concurrency.max(1),
            started_at: Instant::now(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Joins the multicast group and answers queries until [`Responder::stop`] is called.
    ///
    /// Only a failure to join is returned; errors while answering a query are logged and the
    /// loop keeps serving.
    pub async fn start(&self) -> Result<()> {
        self.transport
            .join(self.group)
            .await
            .with_context(|| format!("failed to join multicast group {}", self.group))?;

        info!(
            "Responder for {} listening on {:?}, group {}, log directory {:?}",
            self.settings.instance_name,
            self.transport.local_addr().ok(),
            self.group,
            self.settings.log_directory
        );

        self.serve().await;
        Ok(())
    }

    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    async fn serve(&self) {
        let mut buf = [0u8; QUERY_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    info!("Responder stopped");
                    break;
                }
                received = self.transport.receive(&mut buf) => received,
            };

            // the payload is not inspected: any datagram is a discovery query
            let source = match received {
                Ok((_, source)) => source,
                Err(e) => {
                    warn!("Failed to receive discovery query: {}", e);
                    tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                    continue;
                }
            };

            if let Err(e) = self.answer(source).await {
                error!("Failed to answer discovery query from {}: {:#}", source, e);
            }
        }
    }

    async fn answer(&self, source: SocketAddr) -> Result<()> {
        let query_start = Instant::now();

        let snapshot = self.snapshot().await?;
        let payload = snapshot.to_bytes()?;
        if payload.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(SnapshotError::TooLarge {
                size: payload.len(),
                limit: MAX_DATAGRAM_PAYLOAD,
            }
            .into());
        }

        self.transport
            .send(&payload, source)
            .await
            .with_context(|| format!("failed to send snapshot to {}", source))?;

        debug!(
            "Answered {} with {} nodes in {:?}",
            source,
            snapshot.nodes.len(),
            query_start.elapsed()
        );
        Ok(())
    }

    /// Scans the log directory and probes every job. Nothing is cached between calls.
    pub async fn snapshot(&self) -> Result<PipelineSnapshot> {
        let records = scan_log_directory(&self.settings.log_directory).with_context(|| {
            format!(
                "failed to scan log directory {:?}",
                self.settings.log_directory
            )
        })?;

        let (nodes, elapsed_time) = tokio::join!(self.classify_all(records), self.elapsed_time());

        Ok(PipelineSnapshot {
            instance_name: self.settings.instance_name.clone(),
            log_directory: self.settings.log_directory.display().to_string(),
            host: self.settings.host.clone(),
            process_id: self.settings.process_id,
            definition_blob: self.settings.definition_blob.clone(),
            nodes,
            elapsed_time,
        })
    }

    async fn classify_all(&self, records: Vec<LogFileRecord>) -> BTreeMap<String, JobStatus> {
        let inferencer = &self.inferencer;

        let classified = stream::iter(records)
            .map(|record| async move {
                let status = inferencer.classify(record.process_id).await;
                (record.node_name, status)
            })
            .buffered(self.probe_concurrency)
            .collect::<Vec<_>>()
            .await;

        // in scan order, so a repeated node name keeps the last file's status
        classified.into_iter().collect()
    }

    /// The responder starts with the pipeline, so its own age stands in for the pipeline's.
    async fn elapsed_time(&self) -> String {
        match self
            .inferencer
            .probe()
            .elapsed_time(self.settings.process_id)
            .await
        {
            Ok(elapsed) => elapsed,
            Err(e) => {
                debug!("Falling back to in-process uptime: {}", e);
                format_etime(self.started_at.elapsed().as_secs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MockProcessProbe, ProbeError};
    use crate::transport::MemoryNetwork;
    use std::fs::File;

    fn settings_for(log_directory: &Path) -> ResponderSettings {
        ResponderSettings {
            instance_name: "rnaseq.vtf".to_string(),
            log_directory: log_directory.to_path_buf(),
            definition_blob: "{}".to_string(),
            host: "node07".to_string(),
            process_id: 9000,
        }
    }

    #[tokio::test]
    async fn test_snapshot_classifies_each_log_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in ["build.111.err", "test.222.err", "deploy.333.err", "README"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let mut probe = MockProcessProbe::new();
        probe.expect_command_line().returning(|pid| match pid {
            222 => Ok("viv-exec STDOUT:/tmp/fifo".to_string()),
            333 => Ok("samtools sort".to_string()),
            _ => Err(ProbeError::NotFound { pid }),
        });
        probe
            .expect_elapsed_time()
            .withf(|pid| *pid == 9000)
            .returning(|_| Ok("00:42".to_string()));

        let network = MemoryNetwork::new();
        let responder = Responder::new(
            settings_for(dir.path()),
            network.ephemeral(),
            Arc::new(probe),
            Ipv4Addr::new(224, 3, 28, 70),
            2,
        );

        let snapshot = responder.snapshot().await.unwrap();

        assert_eq!(
            snapshot.nodes,
            BTreeMap::from([
                ("build".to_string(), JobStatus::Completed),
                ("deploy".to_string(), JobStatus::Running),
                ("test".to_string(), JobStatus::Waiting),
            ])
        );
        assert_eq!(snapshot.elapsed_time, "00:42");
        assert_eq!(snapshot.process_id, 9000);
        assert_eq!(snapshot.host, "node07");
    }

    #[tokio::test]
    async fn test_duplicate_node_name_keeps_last_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        File::create(dir.path().join("build.1.err")).unwrap();
        File::create(dir.path().join("build.2.err")).unwrap();

        let mut probe = MockProcessProbe::new();
        probe.expect_command_line().returning(|pid| match pid {
            2 => Ok("make all".to_string()),
            _ => Err(ProbeError::NotFound { pid }),
        });
        probe
            .expect_elapsed_time()
            .returning(|_| Ok("00:01".to_string()));

        let network = MemoryNetwork::new();
        let responder = Responder::new(
            settings_for(dir.path()),
            network.ephemeral(),
            Arc::new(probe),
            Ipv4Addr::new(224, 3, 28, 70),
            8,
        );

        let snapshot = responder.snapshot().await.unwrap();
        assert_eq!(
            snapshot.nodes,
            BTreeMap::from([("build".to_string(), JobStatus::Running)])
        );
    }

    #[tokio::test]
    async fn test_elapsed_time_falls_back_to_uptime() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut probe = MockProcessProbe::new();
        probe
            .expect_elapsed_time()
            .returning(|pid| Err(ProbeError::NotFound { pid }));

        let network = MemoryNetwork::new();
        let responder = Responder::new(
            settings_for(dir.path()),
            network.ephemeral(),
            Arc::new(probe),
            Ipv4Addr::new(224, 3, 28, 70),
            1,
        );

        let snapshot = responder.snapshot().await.unwrap();
        assert!(snapshot.nodes.is_empty());
        assert_eq!(snapshot.elapsed_time, "00:00");
    }

    #[tokio::test]
    async fn test_snapshot_fails_when_log_directory_disappears() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log_directory = dir.path().join("logs");
        fs::create_dir(&log_directory).unwrap();

        let mut probe = MockProcessProbe::new();
        probe
            .expect_elapsed_time()
            .returning(|_| Ok("00:01".to_string()));

        let network = MemoryNetwork::new();
        let responder = Responder::new(
            settings_for(&log_directory),
            network.ephemeral(),
            Arc::new(probe),
            Ipv4Addr::new(224, 3, 28, 70),
            1,
        );
        fs::remove_dir(&log_directory).unwrap();

        assert!(responder.snapshot().await.is_err());
    }

    #[test]
    fn test_settings_reject_missing_log_directory() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("pipeline.vtf");
        fs::write(&path, "{}").unwrap();
        let definition = PipelineDefinition::load(&path).unwrap();

        assert!(ResponderSettings::from_environment(&definition, &dir.path().join("gone")).is_err());

        let settings = ResponderSettings::from_environment(&definition, dir.path()).unwrap();
        assert!(settings.log_directory.is_absolute());
        assert_eq!(settings.process_id, std::process::id());
        assert_eq!(settings.definition_blob, "{}");
    }
}
