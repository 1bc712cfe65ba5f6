/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{ArgMatches, Command};
use log::{info, warn};

use protor_client::{CircuitBreaker, Dispatcher, MetricSample, SendError, Transport, codec};

use crate::opts::ProcArgs;

pub(crate) const COMMAND: &str = "replay";

pub(crate) fn command() -> Command {
    Command::new(COMMAND)
        .about("Send every sample in a JSON file, one connection each")
        .arg(super::input_arg())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    sent: usize,
    skipped: usize,
    failed: usize,
    circuit_open: bool,
}

fn replay<B, T>(dispatcher: &Dispatcher<B, T>, samples: &[MetricSample]) -> ReplaySummary
where
    B: CircuitBreaker,
    T: Transport,
{
    let mut summary = ReplaySummary::default();
    for (i, sample) in samples.iter().enumerate() {
        let valid = codec::is_valid(sample);
        match dispatcher.send(sample) {
            Ok(_) if valid => summary.sent += 1,
            Ok(_) => summary.skipped += 1,
            Err(SendError::CircuitOpen) => {
                warn!("circuit open, {} samples left unsent", samples.len() - i);
                summary.circuit_open = true;
                break;
            }
            Err(e) => {
                warn!("sample #{i}: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}

pub(crate) fn run(proc_args: &ProcArgs, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let path = args
        .get_one::<PathBuf>(super::ARG_INPUT)
        .ok_or_else(|| anyhow!("no input file set"))?;
    let samples = super::read_samples(path)?;

    let dispatcher = proc_args.new_dispatcher();
    let summary = replay(&dispatcher, &samples);
    info!(
        "{} samples: {} sent, {} skipped, {} failed",
        samples.len(),
        summary.sent,
        summary.skipped,
        summary.failed
    );

    if summary.failed > 0 || summary.circuit_open {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
