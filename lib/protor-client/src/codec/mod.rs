/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt::Write;

use crate::sample::{DEFAULT_BUCKETS, MetricKind, MetricSample};

mod decode;
pub use decode::{DecodeError, decode, decode_slice};

const FIELD_DELIMITER: char = '|';
const LIST_DELIMITER: char = ';';

/// Check whether the sample may be put on the wire.
pub fn is_valid(sample: &MetricSample) -> bool {
    sample.kind.is_known() && !sample.name.is_empty()
}

/// Encode the sample as a single protocol line.
///
/// Layout: `name|kind|[buckets|][labels|]value`. No escaping is done, so
/// names, label keys and label values should not contain `|`, `;` or `=`.
pub fn encode(sample: &MetricSample) -> String {
    let mut buf = String::with_capacity(64);
    encode_to(&mut buf, sample);
    buf
}

pub fn encode_to(buf: &mut String, sample: &MetricSample) {
    buf.push_str(&sample.name);
    buf.push(FIELD_DELIMITER);
    buf.push_str(sample.kind.as_str());
    buf.push(FIELD_DELIMITER);

    if sample.kind.is_histogram() {
        push_additional(buf, sample);
    }

    if !sample.labels.is_empty() {
        for (i, (k, v)) in sample.labels.iter().enumerate() {
            if i != 0 {
                buf.push(LIST_DELIMITER);
            }
            buf.push_str(k);
            buf.push('=');
            buf.push_str(v);
        }
        buf.push(FIELD_DELIMITER);
    }

    push_fixed6(buf, sample.value);
}

fn push_additional(buf: &mut String, sample: &MetricSample) {
    let additional: &[f64] = if !sample.additional.is_empty() {
        &sample.additional
    } else if sample.kind == MetricKind::Histogram {
        &DEFAULT_BUCKETS
    } else {
        // linear histogram without boundaries has no segment at all
        return;
    };

    for (i, v) in additional.iter().enumerate() {
        if i != 0 {
            buf.push(LIST_DELIMITER);
        }
        push_shortest(buf, *v);
    }
    buf.push(FIELD_DELIMITER);
}

fn push_shortest(buf: &mut String, v: f64) {
    if let Some(s) = infinity_str(v) {
        buf.push_str(s);
    } else {
        // Display for f64 is the shortest round-trip form without exponent
        let _ = write!(buf, "{v}");
    }
}

fn push_fixed6(buf: &mut String, v: f64) {
    if let Some(s) = infinity_str(v) {
        buf.push_str(s);
    } else {
        let _ = write!(buf, "{v:.6}");
    }
}

fn infinity_str(v: f64) -> Option<&'static str> {
    if v == f64::INFINITY {
        Some("+Inf")
    } else if v == f64::NEG_INFINITY {
        Some("-Inf")
    } else {
        None
    }
}
