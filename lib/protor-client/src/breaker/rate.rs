/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};

use super::{CircuitBreaker, RollingWindow};

const BACKOFF_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct RateBreakerConfig {
    /// trip when the failure rate reaches this value
    pub failure_rate: f64,
    /// no trip before this many calls are seen in the window
    pub min_samples: u64,
    pub window: Duration,
    pub window_buckets: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RateBreakerConfig {
    fn default() -> Self {
        RateBreakerConfig {
            failure_rate: 0.1,
            min_samples: 100,
            window: Duration::from_secs(10),
            window_buckets: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RateBreakerConfig {
    pub fn new(failure_rate: f64, min_samples: u64) -> Self {
        RateBreakerConfig {
            failure_rate,
            min_samples,
            ..Default::default()
        }
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current.mul_f64(BACKOFF_MULTIPLIER).min(self.max_backoff)
    }
}

enum TripState {
    Closed,
    Open { since: Instant, backoff: Duration },
    HalfOpen { backoff: Duration },
}

struct BreakerInner {
    window: RollingWindow,
    state: TripState,
}

/// Breaker tripping on the failure rate seen in a rolling time window.
///
/// Once tripped, a single probe call is let through after a backoff
/// which grows with every failed probe. A successful probe closes the
/// breaker again.
pub struct RateBreaker {
    config: RateBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl Default for RateBreaker {
    fn default() -> Self {
        RateBreaker::with_config(RateBreakerConfig::default())
    }
}

impl RateBreaker {
    pub fn new(failure_rate: f64, min_samples: u64) -> Self {
        RateBreaker::with_config(RateBreakerConfig::new(failure_rate, min_samples))
    }

    pub fn with_config(config: RateBreakerConfig) -> Self {
        let window = RollingWindow::new(config.window, config.window_buckets, Instant::now());
        RateBreaker {
            config,
            inner: Mutex::new(BreakerInner {
                window,
                state: TripState::Closed,
            }),
        }
    }

    pub fn is_tripped(&self) -> bool {
        !matches!(self.lock().state, TripState::Closed)
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready_at(&self, now: Instant) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.state {
            TripState::Closed => true,
            TripState::Open { since, backoff } => {
                if now.saturating_duration_since(since) >= backoff {
                    debug!("circuit breaker half open after {backoff:?}");
                    inner.state = TripState::HalfOpen { backoff };
                    true
                } else {
                    false
                }
            }
            // only one probe at a time
            TripState::HalfOpen { .. } => false,
        }
    }

    fn success_at(&self, now: Instant) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.window.add_success(now);
        if let TripState::HalfOpen { .. } = inner.state {
            info!("circuit breaker reset");
            inner.window.reset();
            inner.state = TripState::Closed;
        }
    }

    fn fail_at(&self, now: Instant) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.window.add_failure(now);
        match inner.state {
            TripState::Closed => {
                let (successes, failures) = inner.window.counts(now);
                let samples = successes + failures;
                if samples >= self.config.min_samples
                    && samples > 0
                    && failures as f64 / samples as f64 >= self.config.failure_rate
                {
                    info!("circuit breaker tripped: {failures} failures in {samples} calls");
                    inner.state = TripState::Open {
                        since: now,
                        backoff: self.config.initial_backoff,
                    };
                }
            }
            TripState::Open { backoff, .. } => {
                inner.state = TripState::Open {
                    since: now,
                    backoff,
                };
            }
            TripState::HalfOpen { backoff } => {
                let backoff = self.config.next_backoff(backoff);
                debug!("circuit breaker probe failed, next probe in {backoff:?}");
                inner.state = TripState::Open {
                    since: now,
                    backoff,
                };
            }
        }
    }
}

impl CircuitBreaker for RateBreaker {
    fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    fn success(&self) {
        self.success_at(Instant::now())
    }

    fn fail(&self) {
        self.fail_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn no_trip_below_min_samples() {
        let breaker = RateBreaker::new(0.1, 100);
        let now = Instant::now();
        for _ in 0..99 {
            breaker.fail_at(now);
        }
        assert!(!breaker.is_tripped());
        assert!(breaker.ready_at(now));

        breaker.fail_at(now);
        assert!(breaker.is_tripped());
        assert!(!breaker.ready_at(now));
    }

    #[test]
    fn trip_on_rate() {
        let breaker = RateBreaker::new(0.1, 100);
        let now = Instant::now();
        for _ in 0..95 {
            breaker.success_at(now);
        }
        for _ in 0..9 {
            breaker.fail_at(now);
        }
        // 9 / 104
        assert!(!breaker.is_tripped());
        breaker.fail_at(now);
        assert!(!breaker.is_tripped());
        // 11 / 107
        breaker.success_at(now);
        breaker.fail_at(now);
        assert!(breaker.is_tripped());
    }

    #[test]
    fn old_failures_expire() {
        let config = RateBreakerConfig {
            min_samples: 4,
            ..Default::default()
        };
        let breaker = RateBreaker::with_config(config);
        let now = Instant::now();
        for _ in 0..3 {
            breaker.fail_at(now);
        }
        let later = now + Duration::from_secs(20);
        breaker.success_at(later);
        breaker.success_at(later);
        breaker.success_at(later);
        breaker.success_at(later);
        assert!(!breaker.is_tripped());
        breaker.fail_at(later);
        // 1 / 5
        assert!(breaker.is_tripped());
    }

    #[test]
    fn probe_after_backoff() {
        let config = RateBreakerConfig {
            failure_rate: 0.5,
            min_samples: 2,
            initial_backoff: ms(100),
            max_backoff: ms(200),
            ..Default::default()
        };
        let breaker = RateBreaker::with_config(config);
        let t0 = Instant::now();
        breaker.fail_at(t0);
        breaker.fail_at(t0);
        assert!(breaker.is_tripped());

        assert!(!breaker.ready_at(t0 + ms(50)));
        assert!(breaker.ready_at(t0 + ms(100)));
        // the probe is in flight
        assert!(!breaker.ready_at(t0 + ms(101)));

        // failed probe, backoff grows to 150ms
        let t1 = t0 + ms(110);
        breaker.fail_at(t1);
        assert!(!breaker.ready_at(t1 + ms(140)));
        assert!(breaker.ready_at(t1 + ms(151)));

        // and is capped
        let t2 = t1 + ms(160);
        breaker.fail_at(t2);
        assert!(!breaker.ready_at(t2 + ms(199)));
        assert!(breaker.ready_at(t2 + ms(200)));

        breaker.success_at(t2 + ms(201));
        assert!(!breaker.is_tripped());
        assert!(breaker.ready_at(t2 + ms(202)));

        // counters were cleared by the reset
        breaker.fail_at(t2 + ms(203));
        assert!(!breaker.is_tripped());
    }

    #[test]
    fn shared_between_threads() {
        let config = RateBreakerConfig {
            failure_rate: 0.5,
            min_samples: 401,
            ..Default::default()
        };
        let breaker = RateBreaker::with_config(config);
        let now = Instant::now();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        assert!(breaker.ready_at(now));
                        breaker.success_at(now);
                        breaker.fail_at(now);
                    }
                });
            }
        });
        assert_eq!(breaker.lock().window.counts(now), (200, 200));
        assert!(!breaker.is_tripped());

        // 201 / 401
        breaker.fail_at(now);
        assert!(breaker.is_tripped());
    }
}
