use std::net::Ipv4Addr;

/// Multicast group every responder joins.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 3, 28, 70);
pub const MULTICAST_PORT: u16 = 10000;
/// Keeps discovery queries on the local network segment.
pub const MULTICAST_TTL: u32 = 2;

/// Canonical discovery payload. Responders do not inspect it.
pub const DISCOVERY_PAYLOAD: &[u8] = b"ping";

pub const IDLE_TIMEOUT_MS: u64 = 2000;
pub const PROBE_TIMEOUT_MS: u64 = 5000;
pub const PROBE_CONCURRENCY: usize = 16;

pub const QUERY_BUFFER_SIZE: usize = 1024;
pub const REPLY_BUFFER_SIZE: usize = 65535;
/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65507;

pub const LOG_FILE_SUFFIX: &str = "err";
