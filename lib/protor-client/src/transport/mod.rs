/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::net::{TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

#[cfg(test)]
mod buf;
#[cfg(test)]
pub(crate) use buf::BufTransport;

mod tcp;
mod udp;
#[cfg(unix)]
mod unix;

/// Capability to open a byte stream to a collector.
///
/// `kind` is the network type, such as `tcp`, and `address` is the
/// peer address in the format that network type expects.
pub trait Transport: Send + Sync {
    type Stream: Write;

    fn open(&self, kind: &str, address: &str) -> io::Result<Self::Stream>;
}

/// Transport over std sockets.
///
/// Both timeouts are disabled by default, so a stalled collector blocks
/// the caller until the OS gives up.
#[derive(Clone, Debug, Default)]
pub struct NetTransport {
    connect_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl NetTransport {
    pub fn new(connect_timeout: Option<Duration>, write_timeout: Option<Duration>) -> Self {
        NetTransport {
            connect_timeout,
            write_timeout,
        }
    }
}

impl Transport for NetTransport {
    type Stream = NetStream;

    fn open(&self, kind: &str, address: &str) -> io::Result<NetStream> {
        match kind {
            "tcp" => {
                let stream = tcp::connect(address, self.connect_timeout)?;
                stream.set_write_timeout(self.write_timeout)?;
                Ok(NetStream::Tcp(stream))
            }
            "udp" => {
                let socket = udp::connect(address)?;
                socket.set_write_timeout(self.write_timeout)?;
                Ok(NetStream::Udp(socket))
            }
            #[cfg(unix)]
            "unix" => {
                let stream = unix::connect(address)?;
                stream.set_write_timeout(self.write_timeout)?;
                Ok(NetStream::Unix(stream))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported network type {kind}"),
            )),
        }
    }
}

pub enum NetStream {
    Tcp(TcpStream),
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetStream::Tcp(s) => s.write(buf),
            NetStream::Udp(s) => s.send(buf),
            #[cfg(unix)]
            NetStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetStream::Tcp(s) => s.flush(),
            NetStream::Udp(_) => Ok(()),
            #[cfg(unix)]
            NetStream::Unix(s) => s.flush(),
        }
    }
}
