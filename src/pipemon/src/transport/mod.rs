//! Datagram transport used by both discovery roles.
//!
//! Responders and the aggregator only see the [`Transport`] capability, so the same code runs
//! over real multicast UDP and over the in-memory network used in tests.
mod memory;
mod udp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use udp::UdpTransport;

use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribes to datagrams sent to `group`.
    async fn join(&self, group: Ipv4Addr) -> io::Result<()>;

    async fn send(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Waits for the next datagram. Payloads longer than `buf` are truncated.
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Like [`Transport::receive`], but gives up after `idle` with `Ok(None)`.
    async fn receive_with_timeout(
        &self,
        buf: &mut [u8],
        idle: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(idle, self.receive(buf)).await {
            Ok(received) => received.map(Some),
            Err(_) => Ok(None),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr>;
}
