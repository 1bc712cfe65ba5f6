/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;
#[cfg(unix)]
use std::path::PathBuf;
use std::time::Duration;

use crate::breaker::RateBreakerConfig;

#[cfg(feature = "yaml")]
mod yaml;
#[cfg(feature = "yaml")]
pub use yaml::as_duration;

const DEFAULT_TCP_ADDRESS: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtorBackend {
    Tcp(String),
    Udp(String),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Default for ProtorBackend {
    fn default() -> Self {
        ProtorBackend::Tcp(DEFAULT_TCP_ADDRESS.to_string())
    }
}

impl ProtorBackend {
    /// Build a backend from a network type and an address
    pub fn parse(kind: &str, address: &str) -> Option<Self> {
        match kind {
            "tcp" => Some(ProtorBackend::Tcp(address.to_string())),
            "udp" => Some(ProtorBackend::Udp(address.to_string())),
            #[cfg(unix)]
            "unix" => Some(ProtorBackend::Unix(PathBuf::from(address))),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProtorBackend::Tcp(_) => "tcp",
            ProtorBackend::Udp(_) => "udp",
            #[cfg(unix)]
            ProtorBackend::Unix(_) => "unix",
        }
    }

    pub fn address(&self) -> Cow<'_, str> {
        match self {
            ProtorBackend::Tcp(addr) | ProtorBackend::Udp(addr) => Cow::Borrowed(addr.as_str()),
            #[cfg(unix)]
            ProtorBackend::Unix(path) => path.to_string_lossy(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatcherConfig {
    backend: ProtorBackend,
    pub connect_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub breaker: RateBreakerConfig,
}

impl DispatcherConfig {
    pub fn new(backend: ProtorBackend) -> Self {
        DispatcherConfig {
            backend,
            ..Default::default()
        }
    }

    #[inline]
    pub fn backend(&self) -> &ProtorBackend {
        &self.backend
    }

    pub fn set_backend(&mut self, target: ProtorBackend) {
        self.backend = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend() {
        let b = ProtorBackend::parse("tcp", "localhost:3000").unwrap();
        assert_eq!(b, ProtorBackend::Tcp("localhost:3000".to_string()));
        assert_eq!(b.kind(), "tcp");
        assert_eq!(b.address(), "localhost:3000");

        let b = ProtorBackend::parse("udp", "[::1]:8125").unwrap();
        assert_eq!(b.kind(), "udp");
        assert_eq!(b.address(), "[::1]:8125");

        #[cfg(unix)]
        {
            let b = ProtorBackend::parse("unix", "/run/collector.sock").unwrap();
            assert_eq!(b.kind(), "unix");
            assert_eq!(b.address(), "/run/collector.sock");
        }

        assert!(ProtorBackend::parse("ip", "1.1.1.1").is_none());
    }

    #[test]
    fn default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.backend().kind(), "tcp");
        assert_eq!(config.backend().address(), DEFAULT_TCP_ADDRESS);
        assert!(config.connect_timeout.is_none());
        assert!(config.write_timeout.is_none());
        assert_eq!(config.breaker.failure_rate, 0.1);
        assert_eq!(config.breaker.min_samples, 100);
    }
}
