/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::anyhow;
use clap::{Arg, ValueHint, value_parser};

use protor_client::{MetricSample, codec};

pub(crate) mod encode;
pub(crate) mod observe;
pub(crate) mod replay;

const ARG_INPUT: &str = "input";

fn input_arg() -> Arg {
    Arg::new(ARG_INPUT)
        .help("JSON file with an array of samples, '-' for stdin")
        .value_name("JSON FILE")
        .required(true)
        .num_args(1)
        .value_hint(ValueHint::FilePath)
        .value_parser(value_parser!(std::path::PathBuf))
}

fn read_samples(path: &Path) -> anyhow::Result<Vec<MetricSample>> {
    let samples = if path == Path::new("-") {
        codec::decode(io::stdin().lock())
    } else {
        let file = File::open(path)
            .map_err(|e| anyhow!("failed to open file {}: {e}", path.display()))?;
        codec::decode(BufReader::new(file))
    };
    samples.map_err(|e| anyhow!("failed to decode samples from {}: {e}", path.display()))
}
