/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, warn};
use thiserror::Error;

use crate::breaker::{CircuitBreaker, RateBreaker};
use crate::codec;
use crate::config::{DispatcherConfig, ProtorBackend};
use crate::sample::{MetricObservation, MetricSample};
use crate::transport::{NetTransport, Transport};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("circuit breaker is in trip state")]
    CircuitOpen,
    #[error("failed to connect to {0}: {1}")]
    Connect(String, io::Error),
}

/// Sends one sample per connection, gated by a circuit breaker.
///
/// Every call to [`Dispatcher::send`] blocks while the connection is
/// opened and the line is written. No timeout is applied unless the
/// transport sets one.
pub struct Dispatcher<B = RateBreaker, T = NetTransport> {
    backend: ProtorBackend,
    breaker: B,
    transport: T,

    create_instant: Instant,
    last_error_report: AtomicU64,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Self {
        Dispatcher::with_parts(
            config.backend().clone(),
            RateBreaker::with_config(config.breaker.clone()),
            NetTransport::new(config.connect_timeout, config.write_timeout),
        )
    }
}

impl<B, T> Dispatcher<B, T>
where
    B: CircuitBreaker,
    T: Transport,
{
    pub fn with_parts(backend: ProtorBackend, breaker: B, transport: T) -> Self {
        Dispatcher {
            backend,
            breaker,
            transport,
            create_instant: Instant::now(),
            last_error_report: AtomicU64::new(u64::MAX),
        }
    }

    #[inline]
    pub fn backend(&self) -> &ProtorBackend {
        &self.backend
    }

    #[inline]
    pub fn breaker(&self) -> &B {
        &self.breaker
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the latency sample for the observation and send it
    pub fn observe(&self, observation: MetricObservation) -> Result<(), SendError> {
        self.send(&observation.build())
    }

    /// Send the sample over a new connection.
    ///
    /// Connect failures are fed into the breaker and returned without any
    /// retry. The connection is opened even for an invalid sample, which is
    /// then dropped silently. Write errors are only logged.
    pub fn send(&self, sample: &MetricSample) -> Result<(), SendError> {
        if !self.breaker.ready() {
            return Err(SendError::CircuitOpen);
        }

        let address = self.backend.address();
        let mut conn = match self.transport.open(self.backend.kind(), &address) {
            Ok(conn) => conn,
            Err(e) => {
                self.breaker.fail();
                return Err(SendError::Connect(address.into_owned(), e));
            }
        };
        self.breaker.success();

        if codec::is_valid(sample) {
            let line = codec::encode(sample);
            if let Err(e) = conn.write_all(line.as_bytes()) {
                self.handle_write_error(e);
            }
        } else {
            debug!(
                "drop invalid sample with name '{}' and kind '{}'",
                sample.name, sample.kind
            );
        }
        Ok(())
    }

    fn handle_write_error(&self, e: io::Error) {
        let time_slice = self.create_instant.elapsed().as_secs() >> 6; // every 64s
        if self.last_error_report.swap(time_slice, Ordering::Relaxed) != time_slice {
            warn!("sending metrics error: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use crate::sample::MetricKind;
    use crate::transport::BufTransport;

    #[derive(Default)]
    struct FakeBreaker {
        tripped: bool,
        ready_calls: AtomicUsize,
        events: Mutex<Vec<&'static str>>,
    }

    impl FakeBreaker {
        fn tripped() -> Self {
            FakeBreaker {
                tripped: true,
                ..Default::default()
            }
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl CircuitBreaker for FakeBreaker {
        fn ready(&self) -> bool {
            self.ready_calls.fetch_add(1, Ordering::Relaxed);
            !self.tripped
        }

        fn success(&self) {
            self.events.lock().unwrap().push("success");
        }

        fn fail(&self) {
            self.events.lock().unwrap().push("fail");
        }
    }

    /// Connects fine, but every write fails
    struct BrokenPipeTransport;

    struct BrokenPipeStream;

    impl Write for BrokenPipeStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for BrokenPipeTransport {
        type Stream = BrokenPipeStream;

        fn open(&self, _kind: &str, _address: &str) -> io::Result<BrokenPipeStream> {
            Ok(BrokenPipeStream)
        }
    }

    fn backend() -> ProtorBackend {
        ProtorBackend::Tcp("localhost:3000".to_string())
    }

    #[test]
    fn send_valid() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BufTransport::default());
        let sample = MetricSample::new("hits", MetricKind::Counter, 3.0).with_label("a", "b");
        dispatcher.send(&sample).unwrap();

        assert_eq!(
            dispatcher.transport().opened(),
            vec![("tcp".to_string(), "localhost:3000".to_string())]
        );
        assert_eq!(
            dispatcher.transport().written(),
            vec![b"hits|c|a=b|3.000000".to_vec()]
        );
        assert_eq!(dispatcher.breaker().events(), vec!["success"]);
    }

    #[test]
    fn send_one_connection_per_sample() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BufTransport::default());
        let s1 = MetricSample::new("a", MetricKind::Gauge, 1.0);
        let s2 = MetricSample::new("b", MetricKind::Gauge, 2.0);
        dispatcher.send(&s1).unwrap();
        dispatcher.send(&s2).unwrap();

        assert_eq!(
            dispatcher.transport().written(),
            vec![b"a|g|1.000000".to_vec(), b"b|g|2.000000".to_vec()]
        );
        assert_eq!(dispatcher.breaker().events(), vec!["success", "success"]);
    }

    #[test]
    fn send_circuit_open() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::tripped(), BufTransport::default());
        let sample = MetricSample::new("hits", MetricKind::Counter, 1.0);
        let r = dispatcher.send(&sample);

        assert!(matches!(r, Err(SendError::CircuitOpen)));
        assert!(dispatcher.transport().opened().is_empty());
        assert!(dispatcher.breaker().events().is_empty());
        assert_eq!(dispatcher.breaker().ready_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn send_connect_failure() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BufTransport::refusing());
        let sample = MetricSample::new("hits", MetricKind::Counter, 1.0);
        let r = dispatcher.send(&sample);

        match r {
            Err(SendError::Connect(addr, e)) => {
                assert_eq!(addr, "localhost:3000");
                assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused);
            }
            _ => panic!("expected connect error"),
        }
        // exactly one attempt
        assert_eq!(dispatcher.transport().opened().len(), 1);
        assert_eq!(dispatcher.breaker().events(), vec!["fail"]);
    }

    #[test]
    fn send_invalid_opens_but_skips_write() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BufTransport::default());

        let sample = MetricSample::new("", MetricKind::Counter, 1.0);
        dispatcher.send(&sample).unwrap();
        let sample = MetricSample::new("x", MetricKind::from("ms"), 1.0);
        dispatcher.send(&sample).unwrap();

        assert_eq!(dispatcher.transport().opened().len(), 2);
        assert_eq!(
            dispatcher.transport().written(),
            vec![Vec::<u8>::new(), Vec::new()]
        );
        assert_eq!(dispatcher.breaker().events(), vec!["success", "success"]);
    }

    #[test]
    fn write_error_not_returned() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BrokenPipeTransport);
        let sample = MetricSample::new("hits", MetricKind::Counter, 1.0);

        dispatcher.send(&sample).unwrap();
        let reported = dispatcher.last_error_report.load(Ordering::Relaxed);
        assert_ne!(reported, u64::MAX);

        // same 64s slice, not reported again
        dispatcher.send(&sample).unwrap();
        assert_eq!(dispatcher.last_error_report.load(Ordering::Relaxed), reported);
        assert_eq!(dispatcher.breaker().events(), vec!["success", "success"]);
    }

    #[test]
    fn write_error_keeps_breaker_closed() {
        let dispatcher =
            Dispatcher::with_parts(backend(), RateBreaker::new(0.1, 2), BrokenPipeTransport);
        let sample = MetricSample::new("hits", MetricKind::Counter, 1.0);
        for _ in 0..4 {
            dispatcher.send(&sample).unwrap();
        }
        assert!(!dispatcher.breaker().is_tripped());
    }

    #[test]
    fn rate_breaker_trips_and_stops_io() {
        let breaker = RateBreaker::new(0.5, 4);
        let dispatcher = Dispatcher::with_parts(backend(), breaker, BufTransport::refusing());
        let sample = MetricSample::new("hits", MetricKind::Counter, 1.0);

        for _ in 0..4 {
            let r = dispatcher.send(&sample);
            assert!(matches!(r, Err(SendError::Connect(_, _))));
        }
        assert!(dispatcher.breaker().is_tripped());

        let r = dispatcher.send(&sample);
        assert!(matches!(r, Err(SendError::CircuitOpen)));
        assert_eq!(dispatcher.transport().opened().len(), 4);
    }

    #[test]
    fn observe_latency() {
        let dispatcher =
            Dispatcher::with_parts(backend(), FakeBreaker::default(), BufTransport::default());
        let observation = MetricObservation::new(std::time::SystemTime::now(), "ingest", "ok");
        dispatcher.observe(observation).unwrap();

        let written = dispatcher.transport().written();
        assert_eq!(written.len(), 1);
        let line = String::from_utf8(written[0].clone()).unwrap();
        assert!(line.starts_with(
            "service_latency_seconds|h|0.005;0.01;0.025;0.05;0.1;0.25;0.5;1;2.5;5;10|"
        ));
        assert!(line.contains("action=ingest;job=attache;status=ok|"));
    }
}
