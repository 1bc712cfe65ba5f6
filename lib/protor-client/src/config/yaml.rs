/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::{Yaml, yaml};

use super::{DispatcherConfig, ProtorBackend};
use crate::breaker::RateBreakerConfig;

impl ProtorBackend {
    fn parse_addr_yaml(v: &Yaml) -> anyhow::Result<String> {
        match v {
            Yaml::Hash(map) => {
                let mut addr: Option<String> = None;
                foreach_kv(map, |k, v| match normalize(k).as_str() {
                    "address" | "addr" => {
                        addr = Some(
                            as_addr_str(v).context(format!("invalid value for key {k}"))?,
                        );
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                addr.ok_or_else(|| anyhow!("no target address has been set"))
            }
            Yaml::String(_) => as_addr_str(v),
            _ => Err(anyhow!("invalid yaml value for network backend")),
        }
    }

    pub fn parse_tcp_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let addr = Self::parse_addr_yaml(v).context("invalid tcp backend")?;
        Ok(ProtorBackend::Tcp(addr))
    }

    pub fn parse_udp_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let addr = Self::parse_addr_yaml(v).context("invalid udp backend")?;
        Ok(ProtorBackend::Udp(addr))
    }

    #[cfg(unix)]
    pub fn parse_unix_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Hash(map) => {
                let mut path: Option<PathBuf> = None;
                foreach_kv(map, |k, v| match normalize(k).as_str() {
                    "path" => {
                        path = Some(
                            as_absolute_path(v)
                                .context(format!("invalid value for key {k}"))?,
                        );
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                if let Some(path) = path.take() {
                    Ok(ProtorBackend::Unix(path))
                } else {
                    Err(anyhow!("no path has been set"))
                }
            }
            Yaml::String(_) => {
                let path = as_absolute_path(v)?;
                Ok(ProtorBackend::Unix(path))
            }
            _ => Err(anyhow!("invalid yaml value for unix backend")),
        }
    }
}

impl RateBreakerConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = RateBreakerConfig::default();
            foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            if config.window_buckets == 0 {
                return Err(anyhow!("window_buckets should not be 0"));
            }
            if config.initial_backoff > config.max_backoff {
                return Err(anyhow!("initial_backoff should not exceed max_backoff"));
            }
            Ok(config)
        } else {
            Err(anyhow!("yaml value type for 'breaker config' should be 'map'"))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize(k).as_str() {
            "failure_rate" | "rate" => {
                let rate = as_f64(v).context(format!("invalid f64 value for key {k}"))?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(anyhow!("value for key {k} should be in range [0, 1]"));
                }
                self.failure_rate = rate;
            }
            "min_samples" => {
                self.min_samples = as_u64(v).context(format!("invalid u64 value for key {k}"))?;
            }
            "window" => {
                self.window =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "window_buckets" => {
                let n = as_u64(v).context(format!("invalid u64 value for key {k}"))?;
                self.window_buckets = usize::try_from(n)?;
            }
            "initial_backoff" => {
                self.initial_backoff =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "max_backoff" => {
                self.max_backoff =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

impl DispatcherConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = DispatcherConfig::default();
            foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'dispatcher config' should be 'map'"
            ))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize(k).as_str() {
            "target_tcp" | "backend_tcp" => {
                let target =
                    ProtorBackend::parse_tcp_yaml(v).context(format!("invalid value for key {k}"))?;
                self.set_backend(target);
            }
            "target_udp" | "backend_udp" => {
                let target =
                    ProtorBackend::parse_udp_yaml(v).context(format!("invalid value for key {k}"))?;
                self.set_backend(target);
            }
            #[cfg(unix)]
            "target_unix" | "backend_unix" => {
                let target = ProtorBackend::parse_unix_yaml(v)
                    .context(format!("invalid value for key {k}"))?;
                self.set_backend(target);
            }
            "target" | "backend" => {
                return if let Yaml::Hash(map) = v {
                    foreach_kv(map, |k, v| match normalize(k).as_str() {
                        "tcp" => {
                            let target = ProtorBackend::parse_tcp_yaml(v)
                                .context(format!("invalid value for key {k}"))?;
                            self.set_backend(target);
                            Ok(())
                        }
                        "udp" => {
                            let target = ProtorBackend::parse_udp_yaml(v)
                                .context(format!("invalid value for key {k}"))?;
                            self.set_backend(target);
                            Ok(())
                        }
                        #[cfg(unix)]
                        "unix" => {
                            let target = ProtorBackend::parse_unix_yaml(v)
                                .context(format!("invalid value for key {k}"))?;
                            self.set_backend(target);
                            Ok(())
                        }
                        _ => Err(anyhow!("invalid key {k}")),
                    })
                    .context(format!("invalid value for key {k}"))
                } else {
                    Err(anyhow!("yaml value type for key {k} should be 'map'"))
                };
            }
            "connect_timeout" => {
                self.connect_timeout = Some(
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?,
                );
            }
            "write_timeout" => {
                self.write_timeout = Some(
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?,
                );
            }
            "breaker" | "circuit_breaker" => {
                self.breaker =
                    RateBreakerConfig::parse_yaml(v).context(format!("invalid value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn as_addr_str(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => {
            let Some((host, port)) = s.rsplit_once(':') else {
                return Err(anyhow!("no port found in address {s}"));
            };
            if host.is_empty() {
                return Err(anyhow!("no host found in address {s}"));
            }
            u16::from_str(port).map_err(|e| anyhow!("invalid port in address {s}: {e}"))?;
            Ok(s.to_string())
        }
        _ => Err(anyhow!("yaml value type for 'address' should be 'string'")),
    }
}

#[cfg(unix)]
fn as_absolute_path(v: &Yaml) -> anyhow::Result<PathBuf> {
    if let Yaml::String(s) = v {
        let path = PathBuf::from(s);
        if path.is_absolute() {
            Ok(path)
        } else {
            Err(anyhow!("path {s} is not absolute"))
        }
    } else {
        Err(anyhow!("yaml value type for 'path' should be 'string'"))
    }
}

fn as_f64(v: &Yaml) -> anyhow::Result<f64> {
    match v {
        Yaml::String(s) | Yaml::Real(s) => {
            f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))
        }
        Yaml::Integer(i) => Ok(*i as f64),
        _ => Err(anyhow!(
            "yaml value type for 'f64' should be 'string', 'integer' or 'real'"
        )),
    }
}

fn as_u64(v: &Yaml) -> anyhow::Result<u64> {
    match v {
        Yaml::String(s) => Ok(u64::from_str(s)?),
        Yaml::Integer(i) => Ok(u64::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'u64' should be 'string' or 'positive integer'"
        )),
    }
}

/// Parse a humanized duration, with seconds as the default unit
pub fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(value) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            if let Ok(u) = u64::try_from(*value) {
                Ok(Duration::from_secs(u))
            } else {
                Err(anyhow!("unsupported duration string"))
            }
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}
