/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{ArgMatches, Command};
use log::warn;

use protor_client::{MetricSample, codec};

pub(crate) const COMMAND: &str = "encode";

pub(crate) fn command() -> Command {
    Command::new(COMMAND)
        .about("Print the wire line of each sample in a JSON file")
        .arg(super::input_arg())
}

fn write_lines<W: Write>(out: &mut W, samples: &[MetricSample]) -> io::Result<usize> {
    let mut invalid = 0;
    for (i, sample) in samples.iter().enumerate() {
        if codec::is_valid(sample) {
            writeln!(out, "{}", codec::encode(sample))?;
        } else {
            warn!(
                "sample #{i} is invalid: name '{}', kind '{}'",
                sample.name, sample.kind
            );
            invalid += 1;
        }
    }
    Ok(invalid)
}

pub(crate) fn run(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let path = args
        .get_one::<PathBuf>(super::ARG_INPUT)
        .ok_or_else(|| anyhow!("no input file set"))?;
    let samples = super::read_samples(path)?;

    let mut stdout = io::stdout().lock();
    let invalid = write_lines(&mut stdout, &samples)?;
    if invalid > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protor_client::MetricKind;

    #[test]
    fn skip_invalid() {
        let samples = vec![
            MetricSample::new("a", MetricKind::Counter, 1.0),
            MetricSample::new("", MetricKind::Counter, 1.0),
            MetricSample::new("b", MetricKind::Histogram, 0.5).with_label("k", "v"),
        ];
        let mut out = Vec::new();
        let invalid = write_lines(&mut out, &samples).unwrap();
        assert_eq!(invalid, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a|c|1.000000\nb|h|0.005;0.01;0.025;0.05;0.1;0.25;0.5;1;2.5;5;10|k=v|0.500000\n"
        );
    }
}
