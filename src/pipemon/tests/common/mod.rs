#![allow(dead_code)]

use async_trait::async_trait;
use pipemon::probe::{ProbeError, ProcessProbe};
use pipemon::responder::{Responder, ResponderSettings};
use pipemon::transport::{MemoryNetwork, MemoryTransport, Transport};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const GROUP: Ipv4Addr = Ipv4Addr::new(224, 3, 28, 70);
pub const PORT: u16 = 10000;

pub fn group_addr() -> SocketAddr {
    SocketAddr::from((GROUP, PORT))
}

/// Scripted process table. Each pid answers with its queued command lines in order and keeps
/// repeating the last one; pids without an entry do not exist.
#[derive(Default)]
pub struct FakeProcessTable {
    command_lines: Mutex<HashMap<u32, VecDeque<String>>>,
    elapsed: HashMap<u32, String>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, command_lines: &[&str]) -> Self {
        self.command_lines
            .lock()
            .unwrap()
            .insert(pid, command_lines.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_elapsed(mut self, pid: u32, elapsed: &str) -> Self {
        self.elapsed.insert(pid, elapsed.to_string());
        self
    }
}

#[async_trait]
impl ProcessProbe for FakeProcessTable {
    async fn command_line(&self, pid: u32) -> Result<String, ProbeError> {
        let mut table = self.command_lines.lock().unwrap();
        let queue = table.get_mut(&pid).ok_or(ProbeError::NotFound { pid })?;
        let command_line = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        command_line.ok_or(ProbeError::NotFound { pid })
    }

    async fn elapsed_time(&self, pid: u32) -> Result<String, ProbeError> {
        self.elapsed
            .get(&pid)
            .cloned()
            .ok_or(ProbeError::NotFound { pid })
    }
}

pub struct TestResponder {
    pub responder: Arc<Responder<MemoryTransport>>,
    pub task: JoinHandle<anyhow::Result<()>>,
    pub log_dir: TempDir,
}

impl TestResponder {
    pub async fn stop(self) -> anyhow::Result<()> {
        self.responder.stop();
        self.task.await?
    }
}

/// Starts a responder on host `10.0.0.<host>` whose log directory holds `log_files`.
pub async fn spawn_responder(
    network: &MemoryNetwork,
    host: u8,
    process_id: u32,
    log_files: &[&str],
    probe: FakeProcessTable,
) -> TestResponder {
    let log_dir = tempfile::tempdir().expect("Failed to create temp dir");
    for name in log_files {
        File::create(log_dir.path().join(name)).unwrap();
    }

    let transport = network.endpoint(SocketAddr::from((Ipv4Addr::new(10, 0, 0, host), PORT)));
    // joined up front so a query sent right after spawning is not lost; joining again in
    // `start` is a no-op on the in-memory network
    transport.join(GROUP).await.unwrap();

    let settings = ResponderSettings {
        instance_name: format!("pipeline-{}.vtf", host),
        log_directory: log_dir.path().to_path_buf(),
        definition_blob: r#"{"nodes":[],"links":[]}"#.to_string(),
        host: format!("node{:02}", host),
        process_id,
    };
    let responder = Arc::new(Responder::new(
        settings,
        transport,
        Arc::new(probe),
        GROUP,
        4,
    ));

    let serving = Arc::clone(&responder);
    let task = tokio::spawn(async move { serving.start().await });

    TestResponder {
        responder,
        task,
        log_dir,
    }
}
