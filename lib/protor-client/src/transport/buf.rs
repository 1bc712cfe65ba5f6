/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::Transport;

/// Transport writing into shared buffers, one per opened stream
#[derive(Default)]
pub(crate) struct BufTransport {
    refuse: bool,
    opened: Mutex<Vec<(String, String)>>,
    streams: Mutex<Vec<Arc<Mutex<Vec<u8>>>>>,
}

impl BufTransport {
    pub(crate) fn refusing() -> Self {
        BufTransport {
            refuse: true,
            ..Default::default()
        }
    }

    pub(crate) fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        let streams = self.streams.lock().unwrap();
        streams.iter().map(|s| s.lock().unwrap().clone()).collect()
    }
}

pub(crate) struct BufStream {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for BufStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        let mut buf = self.buf.lock().unwrap();
        buf.extend_from_slice(msg);
        Ok(msg.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for BufTransport {
    type Stream = BufStream;

    fn open(&self, kind: &str, address: &str) -> io::Result<BufStream> {
        self.opened
            .lock()
            .unwrap()
            .push((kind.to_string(), address.to_string()));
        if self.refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }
        let buf = Arc::new(Mutex::new(Vec::new()));
        self.streams.lock().unwrap().push(buf.clone());
        Ok(BufStream { buf })
    }
}
