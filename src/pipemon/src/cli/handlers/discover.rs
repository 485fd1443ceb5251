use crate::aggregator::{filter_by_log_dir, Aggregator};
use crate::config::Config;
use crate::transport::UdpTransport;
use anyhow::{Context, Result};
use pipemon_common::{info_message, warning_message, Colorize, JobStatus, PipelineSnapshot};
use std::path::Path;
use std::time::Duration;

pub async fn discover(
    config: &Config,
    timeout_ms: Option<u64>,
    json: bool,
    log_dir: Option<&Path>,
) -> Result<()> {
    let transport = UdpTransport::ephemeral(config.multicast_ttl)
        .await
        .context("failed to open discovery socket")?;
    let aggregator = Aggregator::new(transport, config.group_addr(), config.sort_order);

    let idle_timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.idle_timeout());
    let mut snapshots = aggregator.discover_all(idle_timeout).await?;

    if let Some(log_dir) = log_dir {
        let discovered = snapshots.len();
        snapshots = filter_by_log_dir(snapshots, log_dir);
        if snapshots.is_empty() && discovered > 0 {
            warning_message!(
                "Found {} pipeline(s), none logging to {}",
                discovered,
                log_dir.display()
            );
        }
    }

    DiscoverDisplay::new(json).print(&snapshots)
}

struct DiscoverDisplay {
    json: bool,
}

impl DiscoverDisplay {
    fn new(json: bool) -> Self {
        Self { json }
    }

    fn print(&self, snapshots: &[PipelineSnapshot]) -> Result<()> {
        if self.json {
            for snapshot in snapshots {
                println!("{}", serde_json::to_string(snapshot)?);
            }
            return Ok(());
        }

        if snapshots.is_empty() {
            info_message!("No running pipelines found.");
            return Ok(());
        }
        for snapshot in snapshots {
            println!("{}", format_snapshot(snapshot));
        }
        Ok(())
    }
}

fn format_status(status: JobStatus) -> String {
    match status {
        JobStatus::Completed => status.label().dimmed().to_string(),
        JobStatus::Waiting => status.label().yellow().to_string(),
        JobStatus::Running => status.label().green().bold().to_string(),
    }
}

fn format_snapshot(snapshot: &PipelineSnapshot) -> String {
    let mut lines = vec![
        format!(
            "{} on {} (pid {}), running for {}",
            snapshot.instance_name.bold(),
            snapshot.host,
            snapshot.process_id,
            snapshot.elapsed_time
        ),
        format!("  logs: {}", snapshot.log_directory),
        format!(
            "  jobs: {} completed, {} waiting, {} running",
            snapshot.count_by_status(JobStatus::Completed),
            snapshot.count_by_status(JobStatus::Waiting),
            snapshot.count_by_status(JobStatus::Running)
        ),
    ];

    let width = snapshot.nodes.keys().map(String::len).max().unwrap_or(0);
    for (name, status) in &snapshot.nodes {
        lines.push(format!(
            "    {:<width$}  {}",
            name,
            format_status(*status),
            width = width
        ));
    }

    lines.join("\n")
}
