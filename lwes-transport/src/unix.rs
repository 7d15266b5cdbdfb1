//! ## lwes-transport::unix
//! Unix-domain datagram endpoints addressed by filesystem path.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::net::UnixDatagram;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::{PeerAddr, Role, Transport};

#[derive(Debug)]
pub struct UnixTransport {
    socket: RwLock<Option<Arc<UnixDatagram>>>,
    path: PathBuf,
    role: Role,
    closed: CancellationToken,
}

impl UnixTransport {
    /// Send role connects to the peer at `path`; receive role binds and owns it.
    pub fn bind(path: impl Into<PathBuf>, role: Role) -> Result<Self, TransportError> {
        let path = path.into();
        let bind_error = |source| TransportError::Bind {
            address: path.display().to_string(),
            source,
        };

        let socket = match role {
            Role::Send => {
                let socket = UnixDatagram::unbound().map_err(bind_error)?;
                socket.connect(&path).map_err(bind_error)?;
                socket
            }
            Role::Receive => UnixDatagram::bind(&path).map_err(bind_error)?,
        };
        debug!(path = %path.display(), ?role, "unixgram transport bound");

        Ok(Self {
            socket: RwLock::new(Some(Arc::new(socket))),
            path,
            role,
            closed: CancellationToken::new(),
        })
    }

    fn socket(&self) -> Result<Arc<UnixDatagram>, TransportError> {
        self.socket.read().clone().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn read(&self, buf: &mut [u8]) -> Result<(usize, PeerAddr), TransportError> {
        let socket = self.socket()?;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            received = socket.recv_from(buf) => {
                let (len, from) = received?;
                let peer = from.as_pathname().map(Path::to_path_buf);
                Ok((len, PeerAddr::Unix(peer)))
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        let socket = self.socket()?;
        Ok(socket.send(buf).await?)
    }

    /// Closes the socket; a receiver also removes the path it bound.
    fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();
        if self.socket.write().take().is_none() {
            return Ok(());
        }
        debug!(path = %self.path.display(), "unixgram transport closed");

        if self.role == Role::Receive {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %self.path.display(), "socket path already removed");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn role(&self) -> Role {
        self.role
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}
