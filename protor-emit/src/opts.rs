/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};
use yaml_rust::{Yaml, YamlLoader};

use protor_client::{Dispatcher, DispatcherConfig, ProtorBackend};

const GLOBAL_ARG_CONFIG: &str = "config";
const GLOBAL_ARG_TARGET_TCP: &str = "target-tcp";
const GLOBAL_ARG_TARGET_UDP: &str = "target-udp";
const GLOBAL_ARG_TARGET_UNIX: &str = "target-unix";
const GLOBAL_ARG_CONNECT_TIMEOUT: &str = "connect-timeout";
const GLOBAL_ARG_WRITE_TIMEOUT: &str = "write-timeout";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

#[derive(Default)]
pub(crate) struct ProcArgs {
    pub(crate) dispatcher_config: DispatcherConfig,
    pub(crate) verbose_level: u8,
}

impl ProcArgs {
    pub(crate) fn new_dispatcher(&self) -> Dispatcher {
        Dispatcher::new(&self.dispatcher_config)
    }

    fn load_config_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
        let docs = YamlLoader::load_from_str(&content)
            .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
        if let Some(doc) = docs.first() {
            self.dispatcher_config = DispatcherConfig::parse_yaml(doc)
                .context(format!("invalid config in file {}", path.display()))?;
        }
        Ok(())
    }
}

pub(crate) fn add_global_args(app: Command) -> Command {
    app.arg(
        Arg::new(GLOBAL_ARG_CONFIG)
            .help("Load dispatcher config from this yaml file")
            .value_name("CONFIG FILE")
            .short('c')
            .long(GLOBAL_ARG_CONFIG)
            .global(true)
            .num_args(1)
            .value_hint(ValueHint::FilePath)
            .value_parser(value_parser!(PathBuf)),
    )
    .arg(
        Arg::new(GLOBAL_ARG_TARGET_TCP)
            .help("Set the tcp collector address")
            .value_name("HOST:PORT")
            .long(GLOBAL_ARG_TARGET_TCP)
            .global(true)
            .num_args(1)
            .conflicts_with_all([GLOBAL_ARG_TARGET_UDP, GLOBAL_ARG_TARGET_UNIX]),
    )
    .arg(
        Arg::new(GLOBAL_ARG_TARGET_UDP)
            .help("Set the udp collector address")
            .value_name("HOST:PORT")
            .long(GLOBAL_ARG_TARGET_UDP)
            .global(true)
            .num_args(1)
            .conflicts_with(GLOBAL_ARG_TARGET_UNIX),
    )
    .arg(
        Arg::new(GLOBAL_ARG_TARGET_UNIX)
            .help("Set the unix socket path of the collector")
            .value_name("UNIX SOCKET PATH")
            .long(GLOBAL_ARG_TARGET_UNIX)
            .global(true)
            .num_args(1)
            .value_hint(ValueHint::FilePath)
            .value_parser(value_parser!(PathBuf)),
    )
    .arg(
        Arg::new(GLOBAL_ARG_CONNECT_TIMEOUT)
            .help("Timeout for connecting to the collector, in seconds if no unit is given")
            .value_name("TIMEOUT")
            .long(GLOBAL_ARG_CONNECT_TIMEOUT)
            .global(true)
            .num_args(1),
    )
    .arg(
        Arg::new(GLOBAL_ARG_WRITE_TIMEOUT)
            .help("Timeout for writing to the collector, in seconds if no unit is given")
            .value_name("TIMEOUT")
            .long(GLOBAL_ARG_WRITE_TIMEOUT)
            .global(true)
            .num_args(1),
    )
    .arg(
        Arg::new(GLOBAL_ARG_VERBOSE)
            .help("Show more logs, repeat for more")
            .short('v')
            .long(GLOBAL_ARG_VERBOSE)
            .global(true)
            .action(ArgAction::Count),
    )
}

pub(crate) fn parse_global_args(args: &ArgMatches) -> anyhow::Result<ProcArgs> {
    let mut proc_args = ProcArgs::default();

    if let Some(path) = args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG) {
        proc_args.load_config_file(path)?;
    }

    let config = &mut proc_args.dispatcher_config;
    let target = if let Some(addr) = args.get_one::<String>(GLOBAL_ARG_TARGET_TCP) {
        Some(("tcp", addr.to_string()))
    } else if let Some(addr) = args.get_one::<String>(GLOBAL_ARG_TARGET_UDP) {
        Some(("udp", addr.to_string()))
    } else {
        args
            .get_one::<PathBuf>(GLOBAL_ARG_TARGET_UNIX)
            .map(|path| ("unix", path.to_string_lossy().into_owned()))
    };
    if let Some((kind, address)) = target {
        let backend = ProtorBackend::parse(kind, &address).ok_or_else(|| {
            anyhow!("{kind} target {address} is not supported on this platform")
        })?;
        config.set_backend(backend);
    }
    if let Some(s) = args.get_one::<String>(GLOBAL_ARG_CONNECT_TIMEOUT) {
        let timeout =
            parse_timeout(s).context(format!("invalid {GLOBAL_ARG_CONNECT_TIMEOUT} value"))?;
        config.connect_timeout = Some(timeout);
    }
    if let Some(s) = args.get_one::<String>(GLOBAL_ARG_WRITE_TIMEOUT) {
        let timeout =
            parse_timeout(s).context(format!("invalid {GLOBAL_ARG_WRITE_TIMEOUT} value"))?;
        config.write_timeout = Some(timeout);
    }

    proc_args.verbose_level = args.get_count(GLOBAL_ARG_VERBOSE);
    Ok(proc_args)
}

/// Same rules as the yaml config file, seconds if no unit is given
fn parse_timeout(s: &str) -> anyhow::Result<Duration> {
    protor_client::as_duration(&Yaml::String(s.to_string()))
}

/// Milliseconds if no unit is given
pub(crate) fn parse_elapsed(s: &str) -> anyhow::Result<Duration> {
    match humanize_rs::duration::parse(s) {
        Ok(d) => Ok(d),
        Err(humanize_rs::ParseError::MissingUnit) => {
            if let Ok(u) = u64::from_str(s) {
                Ok(Duration::from_millis(u))
            } else {
                Err(anyhow!("invalid duration string {s}"))
            }
        }
        Err(e) => Err(anyhow!("invalid humanize duration string {s}: {e}")),
    }
}
