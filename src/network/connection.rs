//! Per-connection byte plumbing.
//!
//! Non-blocking reads land in a growable input buffer that the framer
//! cuts into `\r\n`-terminated lines; outbound lines wait in a FIFO of
//! byte chunks drained only on write-readiness. A short send leaves the
//! unsent suffix at the head of the queue.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use bytes::{Bytes, BytesMut};
use mio::net::TcpStream;

/// Bytes pulled from the socket per read call.
pub const READ_CHUNK: usize = 4096;

/// Input buffered beyond this without a complete frame costs the client
/// its connection.
pub const MAX_INPUT_BUFFER: usize = 8192;

/// Outcome of a single read attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes were appended to the input buffer.
    Data(usize),
    /// The peer closed the connection.
    Closed,
    /// Nothing to read right now.
    WouldBlock,
}

/// Outcome of draining the write queue.
#[derive(Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Queue fully drained.
    Drained,
    /// The kernel buffer filled; an unsent suffix stays at the head.
    Blocked,
}

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    input: BytesMut,
    output: VecDeque<Bytes>,
    /// Whether the poll registration currently includes write interest.
    armed_writable: bool,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            input: BytesMut::with_capacity(READ_CHUNK),
            output: VecDeque::new(),
            armed_writable: false,
        }
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub fn armed_writable(&self) -> bool {
        self.armed_writable
    }

    pub fn set_armed_writable(&mut self, armed: bool) {
        self.armed_writable = armed;
    }

    /// One non-blocking read of up to [`READ_CHUNK`] bytes, appended to
    /// the input buffer.
    pub fn read_chunk(&mut self) -> io::Result<ReadOutcome> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => {
                    self.input.extend_from_slice(&buf[..n]);
                    return Ok(ReadOutcome::Data(n));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::WouldBlock)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Extract every complete line from the input buffer, leaving a
    /// trailing partial frame in place.
    pub fn take_lines(&mut self) -> Vec<String> {
        split_frames(&mut self.input)
    }

    /// True once the partial frame outgrew the input cap.
    pub fn input_overflowed(&self) -> bool {
        self.input.len() > MAX_INPUT_BUFFER
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Queue one line for sending; the `\r\n` terminator is appended
    /// here. All output goes through the queue so ordering has a single
    /// flow-control point.
    pub fn enqueue_line(&mut self, line: &str) {
        let mut chunk = BytesMut::with_capacity(line.len() + 2);
        chunk.extend_from_slice(line.as_bytes());
        chunk.extend_from_slice(b"\r\n");
        self.output.push_back(chunk.freeze());
    }

    pub fn wants_write(&self) -> bool {
        !self.output.is_empty()
    }

    /// Drain the write queue head-first until empty or the kernel pushes
    /// back.
    pub fn flush(&mut self) -> io::Result<FlushOutcome> {
        while let Some(head) = self.output.front_mut() {
            match self.stream.write(head) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) if n == head.len() => {
                    self.output.pop_front();
                }
                Ok(n) => {
                    *head = head.slice(n..);
                    return Ok(FlushOutcome::Blocked);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(FlushOutcome::Blocked)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(FlushOutcome::Drained)
    }

    /// Snapshot of queued lines, terminators stripped, for assertions.
    #[cfg(test)]
    pub fn queued_lines(&self) -> Vec<String> {
        self.output
            .iter()
            .map(|chunk| {
                String::from_utf8_lossy(chunk)
                    .trim_end_matches("\r\n")
                    .to_string()
            })
            .collect()
    }

    #[cfg(test)]
    pub fn clear_output(&mut self) {
        self.output.clear();
    }
}

/// Cut every complete `\r\n`-terminated line out of `input`, skipping
/// empty lines. Whatever follows the last terminator stays buffered.
pub(crate) fn split_frames(input: &mut BytesMut) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(at) = find_crlf(input) {
        let frame = input.split_to(at + 2);
        let line = &frame[..at];
        if line.is_empty() {
            continue;
        }
        lines.push(String::from_utf8_lossy(line).into_owned());
    }
    lines
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
