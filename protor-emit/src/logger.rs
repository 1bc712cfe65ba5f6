/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io::{self, Write};

use chrono::Local;
use slog::{Drain, KV, Key, Level, OwnedKVList, Record, Serializer, slog_o};
use slog_scope::GlobalLoggerGuard;

struct KvCollector {
    pairs: Vec<(String, String)>,
}

impl Serializer for KvCollector {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        self.pairs.push((key.to_string(), val.to_string()));
        Ok(())
    }
}

/// Synchronous drain writing one plain line per record to stderr
struct StderrDrain {
    append_code_position: bool,
}

impl StderrDrain {
    fn write_record<IO: Write>(
        &self,
        io: &mut IO,
        record: &Record,
        pairs: &[(String, String)],
    ) -> io::Result<()> {
        let datetime = Local::now();
        write!(io, "{}", datetime.format("%Y-%m-%d %H:%M:%S%.6f"))?;
        write!(io, " {}", record.level().as_str())?;
        for (k, v) in pairs {
            write!(io, " {k}: {v},")?;
        }
        write!(io, " {}", record.msg())?;
        if self.append_code_position {
            write!(io, " <{}:{}>", record.file(), record.line())?;
        }
        writeln!(io)?;
        io.flush()
    }
}

impl Drain for StderrDrain {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        let mut collector = KvCollector { pairs: Vec::new() };
        let _ = record.kv().serialize(record, &mut collector);
        let _ = values.serialize(record, &mut collector);

        let mut buf: Vec<u8> = Vec::with_capacity(256);
        self.write_record(&mut buf, record, &collector.pairs)?;
        io::stderr().lock().write_all(&buf)
    }
}

fn levels(verbose_level: u8) -> (Level, log::Level) {
    match verbose_level {
        0 => (Level::Info, log::Level::Info),
        1 => (Level::Debug, log::Level::Debug),
        _ => (Level::Trace, log::Level::Trace),
    }
}

pub(crate) fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let (level, log_level) = levels(verbose_level);
    let drain = StderrDrain {
        append_code_position: verbose_level > 1,
    };
    let logger = slog::Logger::root(drain.filter_level(level).ignore_res(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    slog_stdlog::init_with_level(log_level)?;
    Ok(scope_guard)
}
