/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};

pub const LATENCY_METRIC_NAME: &str = "service_latency_seconds";
pub const JOB_LABEL_VALUE: &str = "attache";

/// Bucket boundaries used for histogram samples that carry none
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    HistogramLinear,
    Other(String),
}

impl MetricKind {
    pub fn as_str(&self) -> &str {
        match self {
            MetricKind::Counter => "c",
            MetricKind::Gauge => "g",
            MetricKind::Histogram => "h",
            MetricKind::HistogramLinear => "hl",
            MetricKind::Other(s) => s.as_str(),
        }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, MetricKind::Other(_))
    }

    #[inline]
    pub fn is_histogram(&self) -> bool {
        matches!(self, MetricKind::Histogram | MetricKind::HistogramLinear)
    }
}

impl From<&str> for MetricKind {
    fn from(s: &str) -> Self {
        match s {
            "c" => MetricKind::Counter,
            "g" => MetricKind::Gauge,
            "h" => MetricKind::Histogram,
            "hl" => MetricKind::HistogramLinear,
            _ => MetricKind::Other(s.to_string()),
        }
    }
}

impl From<String> for MetricKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "c" => MetricKind::Counter,
            "g" => MetricKind::Gauge,
            "h" => MetricKind::Histogram,
            "hl" => MetricKind::HistogramLinear,
            _ => MetricKind::Other(s),
        }
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Other(s) => s,
            k => k.as_str().to_string(),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default_kind", default = "empty_kind")]
    pub kind: MetricKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional: Vec<f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let v = Option::<T>::deserialize(deserializer)?;
    Ok(v.unwrap_or_default())
}

fn null_as_default_kind<'de, D>(deserializer: D) -> Result<MetricKind, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<String>::deserialize(deserializer)?;
    Ok(MetricKind::from(v.unwrap_or_default()))
}

fn empty_kind() -> MetricKind {
    MetricKind::Other(String::new())
}

impl MetricSample {
    pub fn new<N: Into<String>>(name: N, kind: MetricKind, value: f64) -> Self {
        MetricSample {
            name: name.into(),
            kind,
            value,
            labels: BTreeMap::new(),
            additional: Vec::new(),
        }
    }

    pub fn with_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_additional(mut self, additional: Vec<f64>) -> Self {
        self.additional = additional;
        self
    }
}

/// A single timed action, consumed by [`MetricObservation::build`]
#[derive(Clone, Debug)]
pub struct MetricObservation {
    pub start: SystemTime,
    pub action: String,
    pub status: String,
}

impl MetricObservation {
    pub fn new<A: Into<String>, S: Into<String>>(start: SystemTime, action: A, status: S) -> Self {
        MetricObservation {
            start,
            action: action.into(),
            status: status.into(),
        }
    }

    /// Build the latency histogram sample for this observation.
    ///
    /// The value is the wall clock time elapsed since `start`, in seconds.
    /// A `start` in the future yields a negative value.
    pub fn build(self) -> MetricSample {
        self.build_at(SystemTime::now())
    }

    fn build_at(self, now: SystemTime) -> MetricSample {
        let value = match now.duration_since(self.start) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        };
        MetricSample::new(LATENCY_METRIC_NAME, MetricKind::Histogram, value)
            .with_additional(DEFAULT_BUCKETS.to_vec())
            .with_label("action", self.action)
            .with_label("status", self.status)
            .with_label("job", JOB_LABEL_VALUE)
    }
}
