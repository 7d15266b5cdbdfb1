//! # LWES Transport
//!
//! One bound datagram endpoint per value: UDP unicast, UDP multicast, or a
//! unix-domain datagram socket, opened either to send or to receive.
//!
//! Every write is one `send` system call, so concurrent writers never
//! interleave within a datagram. Nothing here retries.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

pub mod address;
pub mod error;
pub mod udp;
#[cfg(unix)]
pub mod unix;

pub use address::{Endpoint, Family, Interface};
pub use error::TransportError;
pub use udp::UdpTransport;
#[cfg(unix)]
pub use unix::UnixTransport;

/// Which side of the conversation a transport is bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Ephemeral local socket with a fixed destination.
    Send,
    /// Socket bound to (or joined on) the target address.
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub role: Role,
    /// Interface for multicast joins, and for outgoing multicast on a sender.
    pub interface: Option<Interface>,
    /// Hop limit for multicast datagrams sent by a send-role socket.
    pub multicast_ttl: u32,
}

impl TransportOptions {
    pub fn send() -> Self {
        Self {
            role: Role::Send,
            interface: None,
            multicast_ttl: 1,
        }
    }

    pub fn receive() -> Self {
        Self {
            role: Role::Receive,
            ..Self::send()
        }
    }

    pub fn with_interface(mut self, interface: Option<Interface>) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_multicast_ttl(mut self, ttl: u32) -> Self {
        self.multicast_ttl = ttl;
        self
    }
}

/// Sender of a received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddr {
    Inet(SocketAddr),
    Unix(Option<PathBuf>),
}

impl PeerAddr {
    /// Canonical textual IP: dotted-quad for IPv4 (including IPv4-mapped IPv6),
    /// RFC 5952 form for IPv6, empty for unix-domain peers.
    pub fn ip_text(&self) -> String {
        match self {
            PeerAddr::Inet(addr) => match addr.ip() {
                IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                    Some(v4) => v4.to_string(),
                    None => v6.to_string(),
                },
                IpAddr::V4(v4) => v4.to_string(),
            },
            PeerAddr::Unix(_) => String::new(),
        }
    }

    /// Sender port, 0 for transports without ports.
    pub fn port(&self) -> u16 {
        match self {
            PeerAddr::Inet(addr) => addr.port(),
            PeerAddr::Unix(_) => 0,
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddr::Inet(addr) => addr.fmt(f),
            PeerAddr::Unix(Some(path)) => path.display().fmt(f),
            PeerAddr::Unix(None) => f.write_str("(unnamed)"),
        }
    }
}

/// Capability shared by every transport kind.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Receives one datagram, reporting who sent it. Fails with
    /// [`TransportError::Closed`] once [`Transport::close`] has been called.
    async fn read(&self, buf: &mut [u8]) -> Result<(usize, PeerAddr), TransportError>;

    /// Sends `buf` as one datagram to the transport's fixed destination.
    async fn write(&self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Releases the socket. Reads and writes issued afterwards fail.
    fn close(&self) -> Result<(), TransportError>;

    fn role(&self) -> Role;

    /// Bound inet address, if this is an inet socket.
    fn local_addr(&self) -> Option<SocketAddr>;
}

/// Parses `address`, then binds the matching transport kind.
pub async fn open(
    address: &str,
    options: TransportOptions,
) -> Result<Arc<dyn Transport>, TransportError> {
    match address.parse::<Endpoint>()? {
        Endpoint::Udp { family, host_port } => {
            let transport = UdpTransport::bind(&host_port, family, options).await?;
            Ok(Arc::new(transport))
        }
        #[cfg(unix)]
        Endpoint::Unixgram { path } => Ok(Arc::new(UnixTransport::bind(path, options.role)?)),
        #[cfg(not(unix))]
        Endpoint::Unixgram { .. } => Err(TransportError::UnsupportedTransport(
            "unixgram".to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn mapped_ipv6_collapses_to_dotted_quad() {
        let mapped = Ipv4Addr::new(192, 168, 0, 9).to_ipv6_mapped();
        let peer = PeerAddr::Inet(SocketAddr::new(mapped.into(), 4000));
        assert_eq!(peer.ip_text(), "192.168.0.9");
        assert_eq!(peer.port(), 4000);
    }

    #[test]
    fn ipv6_uses_compressed_form() {
        let peer = PeerAddr::Inet(SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 1));
        assert_eq!(peer.ip_text(), "::1");
    }

    #[test]
    fn unix_peers_have_no_ip_or_port() {
        let peer = PeerAddr::Unix(Some("/tmp/x.sock".into()));
        assert_eq!(peer.ip_text(), "");
        assert_eq!(peer.port(), 0);
    }
}
