/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Read;

use thiserror::Error;

use crate::sample::MetricSample;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] serde_json::Error),
}

/// Decode a JSON array of samples.
///
/// This is the batch import format used by tooling, not the inverse of
/// [`encode`](super::encode).
pub fn decode<R: Read>(rdr: R) -> Result<Vec<MetricSample>, DecodeError> {
    let samples = serde_json::from_reader(rdr)?;
    Ok(samples)
}

pub fn decode_slice(data: &[u8]) -> Result<Vec<MetricSample>, DecodeError> {
    let samples = serde_json::from_slice(data)?;
    Ok(samples)
}
