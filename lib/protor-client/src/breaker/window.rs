/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Default)]
struct Bucket {
    slot: u64,
    successes: u64,
    failures: u64,
}

pub(super) struct RollingWindow {
    origin: Instant,
    bucket_nanos: u64,
    buckets: Vec<Bucket>,
}

impl RollingWindow {
    pub(super) fn new(window: Duration, bucket_count: usize, origin: Instant) -> Self {
        let bucket_count = bucket_count.max(1);
        let bucket_nanos = (window.as_nanos() / bucket_count as u128).max(1);
        RollingWindow {
            origin,
            bucket_nanos: u64::try_from(bucket_nanos).unwrap_or(u64::MAX),
            buckets: vec![Bucket::default(); bucket_count],
        }
    }

    fn slot_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        u64::try_from(elapsed / self.bucket_nanos as u128).unwrap_or(u64::MAX)
    }

    fn bucket_at(&mut self, now: Instant) -> &mut Bucket {
        let slot = self.slot_at(now);
        let index = (slot % self.buckets.len() as u64) as usize;
        let bucket = &mut self.buckets[index];
        if bucket.slot != slot {
            *bucket = Bucket {
                slot,
                successes: 0,
                failures: 0,
            };
        }
        bucket
    }

    pub(super) fn add_success(&mut self, now: Instant) {
        self.bucket_at(now).successes += 1;
    }

    pub(super) fn add_failure(&mut self, now: Instant) {
        self.bucket_at(now).failures += 1;
    }

    /// Returns (successes, failures) seen inside the window ending at `now`
    pub(super) fn counts(&self, now: Instant) -> (u64, u64) {
        let current = self.slot_at(now);
        let oldest = current.saturating_sub(self.buckets.len() as u64 - 1);
        self.buckets
            .iter()
            .filter(|b| b.slot >= oldest && b.slot <= current)
            .fold((0, 0), |(s, f), b| (s + b.successes, f + b.failures))
    }

    pub(super) fn reset(&mut self) {
        self.buckets.fill(Bucket::default());
    }
}
