//! ## lwes-engine::emitter
//! Sends events and keeps a liveness task running beside the caller.
//!
//! The task emits `System::Heartbeat` on every tick until the shutdown
//! signal fires, then emits `System::Shutdown`. `close` waits for that
//! final emission before releasing the transport.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use lwes_config::EmitterConfig;
use lwes_protocols::{encode, ControlKind, Event};
use lwes_telemetry::{Direction, EventLogger, MetricsRecorder};
use lwes_transport::{self as transport, Interface, Transport, TransportOptions};

use crate::error::EngineError;
use crate::shutdown::{watch_interrupt, ShutdownReason, ShutdownSignal};

/// Process exit status after an interrupt, as shells report SIGINT.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Encode-and-write path shared by the caller and the liveness task.
#[derive(Debug)]
struct Sink {
    transport: Arc<dyn Transport>,
    metrics: Option<MetricsRecorder>,
}

impl Sink {
    async fn send(&self, event: &Event) -> Result<usize, EngineError> {
        let result = match encode(event) {
            Ok(datagram) => self.transport.write(&datagram).await.map_err(EngineError::from),
            Err(e) => Err(e.into()),
        };
        match (&result, &self.metrics) {
            (Ok(len), Some(metrics)) => metrics.record_emitted(*len),
            (Err(_), Some(metrics)) => metrics.emit_failures.inc(),
            _ => {}
        }
        if result.is_ok() {
            EventLogger::log_event(Direction::Sent, event);
        }
        result
    }

    /// Best-effort; failures are logged and reported as `false`.
    async fn send_control(&self, kind: ControlKind) -> bool {
        match self.send(kind.event()).await {
            Ok(_) => true,
            Err(e) => {
                warn!(event = %kind.event().name, error = %e, "control event not sent");
                false
            }
        }
    }
}

/// Liveness settings taken from [`EmitterConfig`].
#[derive(Debug, Clone, Copy)]
struct Liveness {
    heartbeat: Option<Duration>,
    handle_interrupt: bool,
    exit_on_interrupt: bool,
}

#[derive(Debug)]
pub struct Emitter {
    sink: Arc<Sink>,
    shutdown: ShutdownSignal,
    liveness: Mutex<Option<JoinHandle<()>>>,
    interrupt_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Emitter {
    /// Emitter for `address` with every other setting at its default.
    pub async fn open(address: &str) -> Result<Self, EngineError> {
        let config = EmitterConfig {
            address: address.to_owned(),
            ..Default::default()
        };
        Self::start(&config, None).await
    }

    /// Binds the send-role transport, emits `System::Startup` and starts
    /// the liveness task.
    #[instrument(level = "info", name = "emitter_start", skip_all, fields(address = %config.address))]
    pub async fn start(
        config: &EmitterConfig,
        metrics: Option<MetricsRecorder>,
    ) -> Result<Self, EngineError> {
        let interface = config
            .interface
            .as_deref()
            .map(str::parse::<Interface>)
            .transpose()?;
        let options = TransportOptions::send()
            .with_interface(interface)
            .with_multicast_ttl(config.ttl);
        let transport = transport::open(&config.address, options).await?;

        let liveness = Liveness {
            heartbeat: config.heartbeat(),
            handle_interrupt: config.handle_interrupt,
            exit_on_interrupt: config.exit_on_interrupt,
        };
        Ok(Self::with_transport(transport, liveness, metrics).await)
    }

    async fn with_transport(
        transport: Arc<dyn Transport>,
        liveness: Liveness,
        metrics: Option<MetricsRecorder>,
    ) -> Self {
        let sink = Arc::new(Sink { transport, metrics });
        sink.send_control(ControlKind::Startup).await;

        let shutdown = ShutdownSignal::new();
        let interrupt_watcher = liveness
            .handle_interrupt
            .then(|| watch_interrupt(shutdown.clone()));
        let task = tokio::spawn(run_liveness(sink.clone(), liveness, shutdown.clone()));
        info!(heartbeat = ?liveness.heartbeat, "emitter running");

        Self {
            sink,
            shutdown,
            liveness: Mutex::new(Some(task)),
            interrupt_watcher: Mutex::new(interrupt_watcher),
        }
    }

    /// Encodes and sends one event. Nothing is written when encoding fails.
    pub async fn emit(&self, event: &Event) -> Result<usize, EngineError> {
        self.sink.send(event).await
    }

    /// Stops the liveness task after its `System::Shutdown`, then closes
    /// the transport. A second call returns [`EngineError::Closed`].
    #[instrument(level = "info", name = "emitter_close", skip_all)]
    pub async fn close(&self) -> Result<(), EngineError> {
        let task = self.liveness.lock().take().ok_or(EngineError::Closed)?;
        if let Some(watcher) = self.interrupt_watcher.lock().take() {
            watcher.abort();
        }

        self.shutdown.trigger(ShutdownReason::Close);
        if let Err(e) = task.await {
            warn!(error = %e, "liveness task did not finish cleanly");
        }
        self.sink.transport.close()?;
        debug!("emitter closed");
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sink.transport.local_addr()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        if let Some(task) = self.liveness.get_mut().take() {
            task.abort();
        }
        if let Some(watcher) = self.interrupt_watcher.get_mut().take() {
            watcher.abort();
        }
    }
}

async fn run_liveness(sink: Arc<Sink>, liveness: Liveness, shutdown: ShutdownSignal) {
    let reason = match liveness.heartbeat {
        Some(period) => {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    reason = shutdown.cancelled() => break reason,
                    _ = ticks.tick() => {
                        let sent = sink.send_control(ControlKind::Heartbeat).await;
                        if let (true, Some(metrics)) = (sent, &sink.metrics) {
                            metrics.heartbeats.inc();
                        }
                    }
                }
            }
        }
        None => shutdown.cancelled().await,
    };

    sink.send_control(ControlKind::Shutdown).await;

    if reason == ShutdownReason::Interrupt && liveness.exit_on_interrupt {
        if let Err(e) = sink.transport.close() {
            warn!(error = %e, "transport close failed during interrupt");
        }
        info!("exiting after interrupt");
        std::process::exit(INTERRUPT_EXIT_CODE);
    }
}
