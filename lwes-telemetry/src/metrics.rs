//! ## lwes-telemetry::metrics
//! Prometheus counters for datagram traffic.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events_emitted: IntCounter,
    pub emit_failures: IntCounter,
    pub heartbeats: IntCounter,
    pub events_received: IntCounter,
    pub receive_failures: IntCounter,
    pub decode_failures: IntCounter,
    pub datagram_bytes: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let events_emitted = counter("lwes_events_emitted_total", "Events written to a transport")?;
        let emit_failures = counter("lwes_emit_failures_total", "Events that failed to encode or send")?;
        let heartbeats = counter("lwes_heartbeats_total", "Heartbeat events emitted")?;
        let events_received = counter("lwes_events_received_total", "Events decoded from datagrams")?;
        let receive_failures =
            counter("lwes_receive_failures_total", "Transport reads that failed")?;
        let decode_failures =
            counter("lwes_decode_failures_total", "Datagrams that did not decode")?;

        let datagram_bytes = Histogram::with_opts(
            HistogramOpts::new("lwes_datagram_bytes", "Size of datagrams sent and received")
                .buckets(vec![64.0, 256.0, 1024.0, 8192.0, 65507.0]),
        )?;
        registry.register(Box::new(datagram_bytes.clone()))?;

        Ok(Self {
            registry,
            events_emitted,
            emit_failures,
            heartbeats,
            events_received,
            receive_failures,
            decode_failures,
            datagram_bytes,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn record_emitted(&self, bytes: usize) {
        self.events_emitted.inc();
        self.datagram_bytes.observe(bytes as f64);
    }

    pub fn record_received(&self, bytes: usize) {
        self.events_received.inc();
        self.datagram_bytes.observe(bytes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_emitted(120);
        metrics.heartbeats.inc();
        metrics.decode_failures.inc();

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("lwes_events_emitted_total 1"));
        assert!(text.contains("lwes_heartbeats_total 1"));
        assert!(text.contains("lwes_decode_failures_total 1"));
        assert!(text.contains("lwes_datagram_bytes_count 1"));
    }

    #[test]
    fn recorders_do_not_share_registries() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.record_received(10);
        assert_eq!(a.events_received.get(), 1);
        assert_eq!(b.events_received.get(), 0);
    }
}
