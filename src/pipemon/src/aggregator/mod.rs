//! Observer side of discovery: one multicast query, then collect unicast replies until the
//! network goes quiet.
mod ordering;

pub use ordering::{sort_snapshots, SortOrder};

use crate::transport::Transport;
use anyhow::{Context, Result};
use pipemon_common::constants::{DISCOVERY_PAYLOAD, REPLY_BUFFER_SIZE};
use pipemon_common::PipelineSnapshot;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Aggregator<T> {
    transport: T,
    group: SocketAddr,
    order: SortOrder,
}

impl<T: Transport> Aggregator<T> {
    pub fn new(transport: T, group: SocketAddr, order: SortOrder) -> Self {
        Self {
            transport,
            group,
            order,
        }
    }

    /// Sends a single query and returns every reply received before the first `idle_timeout`
    /// of silence, sorted by elapsed time.
    ///
    /// One quiet period ends collection for all responders, so a responder slower than
    /// `idle_timeout` is missed. Duplicate replies are kept.
    pub async fn discover_all(&self, idle_timeout: Duration) -> Result<Vec<PipelineSnapshot>> {
        self.transport
            .send(DISCOVERY_PAYLOAD, self.group)
            .await
            .with_context(|| format!("failed to send discovery query to {}", self.group))?;

        let mut buf = vec![0u8; REPLY_BUFFER_SIZE];
        let mut snapshots = Vec::new();

        loop {
            let (len, source) = match self
                .transport
                .receive_with_timeout(&mut buf, idle_timeout)
                .await
            {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped collecting replies: {}", e);
                    break;
                }
            };

            match PipelineSnapshot::from_bytes(&buf[..len]) {
                Ok(snapshot) => {
                    debug!(
                        "Reply from {}: {} on {} ({} nodes)",
                        source,
                        snapshot.instance_name,
                        snapshot.host,
                        snapshot.nodes.len()
                    );
                    snapshots.push(snapshot);
                }
                Err(e) => warn!("Ignoring malformed reply from {}: {}", source, e),
            }
        }

        info!("Discovered {} pipeline(s)", snapshots.len());
        sort_snapshots(&mut snapshots, self.order);
        Ok(snapshots)
    }
}

/// Keeps the snapshots reported for `log_dir`.
pub fn filter_by_log_dir(snapshots: Vec<PipelineSnapshot>, log_dir: &Path) -> Vec<PipelineSnapshot> {
    // responders report canonical paths
    let wanted = log_dir
        .canonicalize()
        .unwrap_or_else(|_| log_dir.to_path_buf());

    snapshots
        .into_iter()
        .filter(|snapshot| Path::new(&snapshot.log_directory) == wanted)
        .collect()
}
