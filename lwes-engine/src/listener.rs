//! ## lwes-engine::listener
//! Receives datagrams, decodes them and stamps receipt metadata.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, trace};

use lwes_config::ListenerConfig;
use lwes_protocols::{decode, Event, MAX_MSG_SIZE};
use lwes_telemetry::{Direction, EventLogger, MetricsRecorder};
use lwes_transport::{self as transport, Interface, PeerAddr, Transport, TransportOptions};

use crate::error::EngineError;

/// Milliseconds since the Unix epoch when the datagram was read.
pub const RECEIPT_TIME: &str = "ReceiptTime";
/// Sender address as canonical text, empty for unix-domain peers.
pub const SENDER_IP: &str = "SenderIP";
/// Sender port, 0 for unix-domain peers.
pub const SENDER_PORT: &str = "SenderPort";

#[derive(Debug)]
pub struct Listener {
    transport: Arc<dyn Transport>,
    metrics: Option<MetricsRecorder>,
}

impl Listener {
    /// Listener on `address` with no interface restriction.
    pub async fn bind(address: &str) -> Result<Self, EngineError> {
        let config = ListenerConfig {
            address: address.to_owned(),
            interface: None,
        };
        Self::from_config(&config, None).await
    }

    #[instrument(level = "info", name = "listener_bind", skip_all, fields(address = %config.address))]
    pub async fn from_config(
        config: &ListenerConfig,
        metrics: Option<MetricsRecorder>,
    ) -> Result<Self, EngineError> {
        let interface = config
            .interface
            .as_deref()
            .map(str::parse::<Interface>)
            .transpose()?;
        let options = TransportOptions::receive().with_interface(interface);
        let transport = transport::open(&config.address, options).await?;
        debug!(local = ?transport.local_addr(), "listener bound");
        Ok(Self { transport, metrics })
    }

    /// Waits for one datagram and returns it decoded and enriched.
    pub async fn receive(&self) -> Result<Event, EngineError> {
        let mut buf = vec![0u8; MAX_MSG_SIZE];
        self.receive_into(&mut buf).await
    }

    async fn receive_into(&self, buf: &mut [u8]) -> Result<Event, EngineError> {
        let (len, peer) = match self.transport.read(buf).await {
            Ok(read) => read,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.receive_failures.inc();
                }
                return Err(e.into());
            }
        };
        let received_at = Utc::now();

        let mut event = match decode(&buf[..len]) {
            Ok(event) => event,
            Err(e) => {
                trace!(%peer, datagram = %hex::encode(&buf[..len]), "undecodable datagram");
                if let Some(metrics) = &self.metrics {
                    metrics.decode_failures.inc();
                }
                return Err(e.into());
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_received(len);
        }

        enrich(&mut event, received_at.timestamp_millis(), &peer);
        EventLogger::log_event(Direction::Received, &event);
        Ok(event)
    }

    /// Feeds every receive result to `callback` until it breaks.
    ///
    /// Errors do not end the loop; the callback decides what is fatal.
    pub async fn for_each<B, F>(&self, mut callback: F) -> B
    where
        F: FnMut(Result<Event, EngineError>) -> ControlFlow<B>,
    {
        let mut buf = vec![0u8; MAX_MSG_SIZE];
        loop {
            if let ControlFlow::Break(value) = callback(self.receive_into(&mut buf).await) {
                return value;
            }
        }
    }

    /// Closes the transport; a pending `receive` fails with a closed error.
    pub fn close(&self) -> Result<(), EngineError> {
        Ok(self.transport.close()?)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }
}

fn enrich(event: &mut Event, received_at_ms: i64, peer: &PeerAddr) {
    event.set(RECEIPT_TIME, received_at_ms);
    event.set(SENDER_IP, peer.ip_text());
    event.set(SENDER_PORT, peer.port());
}
