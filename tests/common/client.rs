//! Test IRC client.
//!
//! A line-oriented client over a blocking socket with a read timeout,
//! for sending commands and asserting on received replies.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

pub struct TestClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TestClient {
    pub fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    /// Send one line; the CRLF terminator is appended here.
    pub fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send raw bytes with no terminator, for framing tests.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Receive a single line, terminator stripped.
    pub fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until one satisfies the predicate; returns every
    /// line read, the matching one last.
    pub fn recv_until(
        &mut self,
        mut predicate: impl FnMut(&str) -> bool,
    ) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv()?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Complete the PASS/NICK/USER handshake and wait for the welcome
    /// block to finish (422 is its last line).
    pub fn register(&mut self, password: &str, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("PASS {}", password))?;
        self.send_raw(&format!("NICK {}", nick))?;
        self.send_raw(&format!("USER {} 0 * :{}", nick, nick))?;
        self.recv_until(|line| line.starts_with("422"))?;
        Ok(())
    }

    /// True when the server closes the connection within the read
    /// timeout.
    pub fn wait_closed(&mut self) -> bool {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    }
}
