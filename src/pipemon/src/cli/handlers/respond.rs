use crate::config::Config;
use crate::definition::PipelineDefinition;
use crate::responder::{Responder, ResponderSettings};
use crate::transport::UdpTransport;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs a responder until it is killed or interrupted.
pub async fn respond(config: &Config, definition: &Path, log_dir: &Path) -> Result<()> {
    let definition = PipelineDefinition::load(definition)?;
    let settings = ResponderSettings::from_environment(&definition, log_dir)?;

    let transport = UdpTransport::bind_shared(config.multicast_port)
        .with_context(|| format!("failed to bind discovery port {}", config.multicast_port))?;
    let probe = config.probe_backend.build(config.probe_timeout());

    let responder = Arc::new(Responder::new(
        settings,
        transport,
        probe,
        config.multicast_group,
        config.probe_concurrency,
    ));

    let stopper = Arc::clone(&responder);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping responder");
            stopper.stop();
        }
    });

    responder.start().await
}
