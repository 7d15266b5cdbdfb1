//! ## lwes-transport::udp
//! UDP unicast and multicast endpoints.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::{lookup_host, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::address::{Family, Interface};
use crate::error::TransportError;
use crate::{PeerAddr, Role, Transport, TransportOptions};

#[derive(Debug)]
pub struct UdpTransport {
    socket: RwLock<Option<Arc<UdpSocket>>>,
    /// Destination of every write; for receivers, the bound target.
    target: SocketAddr,
    local: SocketAddr,
    role: Role,
    closed: CancellationToken,
}

impl UdpTransport {
    /// Resolves `host_port` and binds for `options.role`.
    ///
    /// Send role binds an ephemeral port and remembers the target. Receive
    /// role joins the group when the target is multicast, otherwise binds
    /// the target address directly.
    pub async fn bind(
        host_port: &str,
        family: Family,
        options: TransportOptions,
    ) -> Result<Self, TransportError> {
        let target = resolve(host_port, family).await?;

        let socket = match options.role {
            Role::Send => bind_sender(target, &options).await?,
            Role::Receive if target.ip().is_multicast() => {
                bind_group(target, options.interface).await?
            }
            Role::Receive => UdpSocket::bind(target)
                .await
                .map_err(|source| bind_error(target, source))?,
        };
        let local = socket.local_addr()?;
        debug!(%target, %local, role = ?options.role, "udp transport bound");

        Ok(Self {
            socket: RwLock::new(Some(Arc::new(socket))),
            target,
            local,
            role: options.role,
            closed: CancellationToken::new(),
        })
    }

    fn socket(&self) -> Result<Arc<UdpSocket>, TransportError> {
        self.socket.read().clone().ok_or(TransportError::Closed)
    }
}

async fn resolve(host_port: &str, family: Family) -> Result<SocketAddr, TransportError> {
    let resolve_error = |source| TransportError::Resolve {
        address: host_port.to_owned(),
        source,
    };
    let mut candidates = lookup_host(host_port).await.map_err(resolve_error)?;
    candidates.find(|addr| family.admits(addr)).ok_or_else(|| {
        resolve_error(io::Error::new(
            io::ErrorKind::NotFound,
            "no address of the requested family",
        ))
    })
}

fn bind_error(address: SocketAddr, source: io::Error) -> TransportError {
    TransportError::Bind {
        address: address.to_string(),
        source,
    }
}

async fn bind_sender(
    target: SocketAddr,
    options: &TransportOptions,
) -> Result<UdpSocket, TransportError> {
    let local: SocketAddr = match target.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local)
        .await
        .map_err(|source| bind_error(local, source))?;

    if target.ip().is_multicast() {
        let sock = SockRef::from(&socket);
        let configured = match (target.ip(), options.interface) {
            (IpAddr::V4(_), interface) => {
                let outgoing = match interface {
                    None => None,
                    Some(Interface::Addr(addr)) => Some(addr),
                    Some(Interface::Index(index)) => {
                        return Err(TransportError::InvalidInterface(index.to_string()))
                    }
                };
                sock.set_multicast_ttl_v4(options.multicast_ttl)
                    .and_then(|_| sock.set_multicast_loop_v4(true))
                    .and_then(|_| match outgoing {
                        Some(addr) => sock.set_multicast_if_v4(&addr),
                        None => Ok(()),
                    })
            }
            (IpAddr::V6(_), interface) => {
                let outgoing = match interface {
                    None => None,
                    Some(Interface::Index(index)) => Some(index),
                    Some(Interface::Addr(addr)) => {
                        return Err(TransportError::InvalidInterface(addr.to_string()))
                    }
                };
                sock.set_multicast_hops_v6(options.multicast_ttl)
                    .and_then(|_| sock.set_multicast_loop_v6(true))
                    .and_then(|_| match outgoing {
                        Some(index) => sock.set_multicast_if_v6(index),
                        None => Ok(()),
                    })
            }
        };
        configured.map_err(|source| bind_error(local, source))?;
    }
    Ok(socket)
}

/// Socket on `local` that other group members on this host may share.
fn shared_socket(local: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    if local.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.bind(&local.into())?;
    Ok(socket)
}

/// Binds the group address itself so unicast sent to the port is not
/// delivered; Windows cannot bind a multicast address and takes the wildcard.
fn group_bind_addr(group: SocketAddr) -> SocketAddr {
    if cfg!(windows) {
        let unspecified: IpAddr = match group.ip() {
            IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            IpAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        SocketAddr::new(unspecified, group.port())
    } else {
        group
    }
}

async fn bind_group(
    group: SocketAddr,
    interface: Option<Interface>,
) -> Result<UdpSocket, TransportError> {
    let join_error = |source| TransportError::Join {
        group: group.to_string(),
        source,
    };
    let local = group_bind_addr(group);
    let socket = shared_socket(local).map_err(|source| bind_error(local, source))?;

    match group.ip() {
        IpAddr::V4(ip) => {
            let interface = match interface {
                None => Ipv4Addr::UNSPECIFIED,
                Some(Interface::Addr(addr)) => addr,
                Some(Interface::Index(index)) => {
                    return Err(TransportError::InvalidInterface(index.to_string()))
                }
            };
            socket
                .join_multicast_v4(&ip, &interface)
                .map_err(join_error)?;
        }
        IpAddr::V6(ip) => {
            let index = match interface {
                None => 0,
                Some(Interface::Index(index)) => index,
                Some(Interface::Addr(addr)) => {
                    return Err(TransportError::InvalidInterface(addr.to_string()))
                }
            };
            socket.join_multicast_v6(&ip, index).map_err(join_error)?;
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(|source| bind_error(local, source))?;
    Ok(UdpSocket::from_std(socket.into())?)
}

#[async_trait]
impl Transport for UdpTransport {
    async fn read(&self, buf: &mut [u8]) -> Result<(usize, PeerAddr), TransportError> {
        let socket = self.socket()?;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            received = socket.recv_from(buf) => {
                let (len, from) = received?;
                Ok((len, PeerAddr::Inet(from)))
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        let socket = self.socket()?;
        Ok(socket.send_to(buf, self.target).await?)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();
        if self.socket.write().take().is_some() {
            debug!(local = %self.local, "udp transport closed");
        }
        Ok(())
    }

    fn role(&self) -> Role {
        self.role
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local)
    }
}
