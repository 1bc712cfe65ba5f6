/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::process::ExitCode;
use std::time::{Duration, SystemTime};

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command};
use log::{error, info};

use protor_client::MetricObservation;

use crate::opts::{ProcArgs, parse_elapsed};

pub(crate) const COMMAND: &str = "observe";

const ARG_ACTION: &str = "action";
const ARG_STATUS: &str = "status";
const ARG_ELAPSED: &str = "elapsed";

pub(crate) fn command() -> Command {
    Command::new(COMMAND)
        .about("Send one latency sample for an action")
        .arg(
            Arg::new(ARG_ACTION)
                .help("Action label value")
                .value_name("ACTION")
                .long(ARG_ACTION)
                .short('a')
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new(ARG_STATUS)
                .help("Status label value")
                .value_name("STATUS")
                .long(ARG_STATUS)
                .short('s')
                .num_args(1)
                .default_value("ok"),
        )
        .arg(
            Arg::new(ARG_ELAPSED)
                .help("Time spent on the action, in milliseconds if no unit is given")
                .value_name("ELAPSED TIME")
                .long(ARG_ELAPSED)
                .short('e')
                .num_args(1)
                .default_value("0"),
        )
}

fn parse_observation(args: &ArgMatches) -> anyhow::Result<MetricObservation> {
    let action = args
        .get_one::<String>(ARG_ACTION)
        .ok_or_else(|| anyhow!("no action set"))?;
    let status = args
        .get_one::<String>(ARG_STATUS)
        .ok_or_else(|| anyhow!("no status set"))?;
    let elapsed = match args.get_one::<String>(ARG_ELAPSED) {
        Some(s) => parse_elapsed(s).context(format!("invalid {ARG_ELAPSED} value"))?,
        None => Duration::ZERO,
    };

    let now = SystemTime::now();
    let start = now
        .checked_sub(elapsed)
        .ok_or_else(|| anyhow!("elapsed time {elapsed:?} is out of range"))?;
    Ok(MetricObservation::new(start, action, status))
}

pub(crate) fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let observation = parse_observation(args)?;
    let dispatcher = proc_args.new_dispatcher();
    let backend = dispatcher.backend();

    match dispatcher.observe(observation) {
        Ok(_) => {
            info!("sample sent to {} {}", backend.kind(), backend.address());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
