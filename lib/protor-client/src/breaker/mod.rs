/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

mod window;
use window::RollingWindow;

mod rate;
pub use rate::{RateBreaker, RateBreakerConfig};

/// Gate in front of every collector connection.
///
/// Implementations must be safe to share between threads, as one breaker
/// is used by all callers of a dispatcher.
pub trait CircuitBreaker: Send + Sync {
    /// Whether a call may be attempted now
    fn ready(&self) -> bool;
    fn success(&self);
    fn fail(&self);
}

impl<T: CircuitBreaker + ?Sized> CircuitBreaker for Arc<T> {
    fn ready(&self) -> bool {
        self.as_ref().ready()
    }

    fn success(&self) {
        self.as_ref().success()
    }

    fn fail(&self) {
        self.as_ref().fail()
    }
}
