/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use clap_complete::Shell;

mod logger;
mod opts;
mod target;

const COMMAND_VERSION: &str = "version";
const COMMAND_COMPLETION: &str = "completion";

fn build_cli_args() -> Command {
    opts::add_global_args(Command::new(env!("CARGO_PKG_NAME")))
        .subcommand_required(true)
        .subcommand_value_name("ACTION")
        .subcommand(Command::new(COMMAND_VERSION).override_help("Show version"))
        .subcommand(
            Command::new(COMMAND_COMPLETION).arg(
                Arg::new("target")
                    .value_name("SHELL")
                    .required(true)
                    .num_args(1)
                    .value_parser(value_parser!(Shell)),
            ),
        )
        .subcommand(target::observe::command())
        .subcommand(target::replay::command())
        .subcommand(target::encode::command())
}

fn main() -> anyhow::Result<ExitCode> {
    let args = build_cli_args().get_matches();

    let (subcommand, sub_args) = args
        .subcommand()
        .ok_or_else(|| anyhow!("no subcommand found"))?;

    match subcommand {
        COMMAND_VERSION => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        COMMAND_COMPLETION => {
            generate_completion(sub_args);
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let proc_args = opts::parse_global_args(&args)?;
    let _log_guard = logger::setup(proc_args.verbose_level).context("failed to setup logger")?;

    match subcommand {
        target::observe::COMMAND => target::observe::run(&proc_args, sub_args),
        target::replay::COMMAND => target::replay::run(&proc_args, sub_args),
        target::encode::COMMAND => target::encode::run(sub_args),
        cmd => Err(anyhow!("invalid subcommand {cmd}")),
    }
}

fn generate_completion(args: &ArgMatches) {
    if let Some(target) = args.get_one::<Shell>("target") {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
    }
}
