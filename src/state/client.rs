//! Per-client identity and registration state.

use std::os::fd::RawFd;
use std::time::Instant;

use crate::network::Connection;

/// The hostname emitted in originator prefixes. Peer addresses are not
/// resolved; every client shows as `host`.
pub const CLIENT_HOST: &str = "host";

/// A connected client. The socket descriptor is its stable handle for
/// the client's whole lifetime.
#[derive(Debug)]
pub struct Client {
    fd: RawFd,
    pub conn: Connection,
    pub nickname: String,
    pub username: String,
    pub hostname: String,
    /// True once PASS matched the server password.
    pub password_validated: bool,
    /// True once PASS, NICK, and USER have all succeeded.
    pub registered: bool,
    /// Removal is deferred to the end of the current loop iteration.
    pub disconnected: bool,
    /// Names of joined channels, in join order.
    pub channels: Vec<String>,
    pub connected_at: Instant,
}

impl Client {
    pub fn new(fd: RawFd, conn: Connection) -> Self {
        Self {
            fd,
            conn,
            nickname: String::new(),
            username: String::new(),
            hostname: CLIENT_HOST.to_string(),
            password_validated: false,
            registered: false,
            disconnected: false,
            channels: Vec::new(),
            connected_at: Instant::now(),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// `:nick!user@host` originator prefix for broadcasts.
    pub fn prefix(&self) -> String {
        format!(":{}!{}@{}", self.nickname, self.username, self.hostname)
    }

    pub fn is_in(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    pub fn mark_disconnected(&mut self) {
        self.disconnected = true;
    }
}
