use super::Transport;
use async_trait::async_trait;
use nix::sys::socket::{
    bind, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockProtocol, SockType, SockaddrIn,
};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::fd::AsRawFd;
use tokio::net::UdpSocket;
use tracing::debug;

/// UDP socket transport with IPv4 multicast support.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds `0.0.0.0:port` with `SO_REUSEADDR` set, so every responder on a host can listen on
    /// the same well-known port and each receives its own copy of a group datagram.
    pub fn bind_shared(port: u16) -> io::Result<Self> {
        let fd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            // not inherited by probe children
            SockFlag::SOCK_CLOEXEC,
            SockProtocol::Udp,
        )?;
        setsockopt(&fd, sockopt::ReuseAddr, &true)?;
        bind(
            fd.as_raw_fd(),
            &SockaddrIn::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)),
        )?;

        let socket = std::net::UdpSocket::from(fd);
        socket.set_nonblocking(true)?;
        debug!("bound shared udp socket on port {}", port);

        Ok(Self {
            socket: UdpSocket::from_std(socket)?,
        })
    }

    /// Binds an ephemeral port for sending queries. `ttl` limits how many hops multicast
    /// datagrams travel.
    pub async fn ephemeral(ttl: u32) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_multicast_ttl_v4(ttl)?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn join(&self, group: Ipv4Addr) -> io::Result<()> {
        // INADDR_ANY lets the kernel pick the interface
        self.socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
    }

    async fn send(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(payload, target).await
    }

    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shared_port_can_be_bound_twice() {
        let first = UdpTransport::bind_shared(0).unwrap();
        let port = first.local_addr().unwrap().port();

        let second = UdpTransport::bind_shared(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_shared_socket_is_close_on_exec() {
        use nix::fcntl::{fcntl, FcntlArg, FdFlag};

        let transport = UdpTransport::bind_shared(0).unwrap();
        let flags = fcntl(transport.socket.as_raw_fd(), FcntlArg::F_GETFD).unwrap();

        assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
    }

    #[tokio::test]
    async fn test_unicast_exchange_over_loopback() {
        let server = UdpTransport::bind_shared(0).unwrap();
        let server_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, server.local_addr().unwrap().port()));
        let client = UdpTransport::ephemeral(1).await.unwrap();

        client.send(b"ping", server_addr).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = server
            .receive_with_timeout(&mut buf, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(&buf[..len], b"ping");
        assert_eq!(from.port(), client.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn test_idle_receive_returns_none() {
        let client = UdpTransport::ephemeral(1).await.unwrap();
        let mut buf = [0u8; 16];

        let received = client
            .receive_with_timeout(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(received.is_none());
    }
}
