/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod sample;
pub use sample::{
    DEFAULT_BUCKETS, JOB_LABEL_VALUE, LATENCY_METRIC_NAME, MetricKind, MetricObservation,
    MetricSample,
};

pub mod codec;

pub mod breaker;
pub use breaker::{CircuitBreaker, RateBreaker, RateBreakerConfig};

pub mod transport;
pub use transport::{NetStream, NetTransport, Transport};

mod config;
pub use config::{DispatcherConfig, ProtorBackend};
#[cfg(feature = "yaml")]
pub use config::as_duration;

mod dispatcher;
pub use dispatcher::{Dispatcher, SendError};
