/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::os::unix::net::UnixStream;

pub(super) fn connect(path: &str) -> io::Result<UnixStream> {
    UnixStream::connect(path)
}
