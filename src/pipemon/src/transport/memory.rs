use super::Transport;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

type Datagram = (Vec<u8>, SocketAddr);

#[derive(Default)]
struct NetworkState {
    endpoints: HashMap<SocketAddr, UnboundedSender<Datagram>>,
    memberships: HashMap<Ipv4Addr, HashSet<SocketAddr>>,
    next_ephemeral_port: u16,
}

/// In-process datagram network.
///
/// Delivery follows UDP multicast: a datagram addressed to a group reaches every endpoint that
/// joined the group and listens on the destination port; anything addressed to an unknown
/// endpoint is dropped.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an endpoint at `addr`. Several hosts may use the same port.
    pub fn endpoint(&self, addr: SocketAddr) -> MemoryTransport {
        let (sender, receiver) = unbounded_channel();
        self.lock().endpoints.insert(addr, sender);

        MemoryTransport {
            addr,
            network: self.clone(),
            inbox: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Attaches an endpoint on loopback with a fresh port.
    pub fn ephemeral(&self) -> MemoryTransport {
        let port = {
            let mut state = self.lock();
            state.next_ephemeral_port = state.next_ephemeral_port.max(49152) + 1;
            state.next_ephemeral_port
        };
        self.endpoint(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn join(&self, member: SocketAddr, group: Ipv4Addr) {
        self.lock().memberships.entry(group).or_default().insert(member);
    }

    fn deliver(&self, payload: &[u8], from: SocketAddr, target: SocketAddr) {
        let state = self.lock();
        let recipients: Vec<SocketAddr> = match target.ip() {
            IpAddr::V4(group) if group.is_multicast() => state
                .memberships
                .get(&group)
                .map(|members| {
                    members
                        .iter()
                        .filter(|member| member.port() == target.port())
                        .copied()
                        .collect()
                })
                .unwrap_or_default(),
            _ => vec![target],
        };

        for recipient in recipients {
            if let Some(sender) = state.endpoints.get(&recipient) {
                // the receiving side may already be gone; UDP drops silently too
                let _ = sender.send((payload.to_vec(), from));
            }
        }
    }
}

/// One endpoint of a [`MemoryNetwork`].
pub struct MemoryTransport {
    addr: SocketAddr,
    network: MemoryNetwork,
    inbox: tokio::sync::Mutex<UnboundedReceiver<Datagram>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn join(&self, group: Ipv4Addr) -> io::Result<()> {
        if !group.is_multicast() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a multicast address", group),
            ));
        }
        self.network.join(self.addr, group);
        Ok(())
    }

    async fn send(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.network.deliver(payload, self.addr, target);
        Ok(payload.len())
    }

    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let (payload, from) = self.inbox.lock().await.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionAborted, "endpoint detached")
        })?;

        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Ok((len, from))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}
