//! Server-owned state tables.
//!
//! Clients and channels live in two server-owned maps. Membership is
//! bidirectional, so neither side owns the other: channels hold member
//! descriptors, clients hold channel names, and every cross-reference is
//! resolved through [`ServerState`] on use. A stale key reads as absent.

pub mod channel;
pub mod client;

pub use channel::Channel;
pub use client::Client;

use std::collections::{BTreeSet, HashMap};
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use minirc_proto::Response;
use tracing::{debug, info};

use crate::network::Connection;

/// How long an unregistered client may linger before it is dropped.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Server name used in reply text.
pub const SERVER_NAME: &str = "minircd";

/// Server version advertised during registration.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The mutable heart of the server: every connected client keyed by
/// descriptor and every live channel keyed by name.
#[derive(Debug)]
pub struct ServerState {
    password: String,
    pub clients: HashMap<RawFd, Client>,
    pub channels: HashMap<String, Channel>,
}

impl ServerState {
    pub fn new(password: String) -> Self {
        Self {
            password,
            clients: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        candidate == self.password
    }

    pub fn add_client(&mut self, fd: RawFd, conn: Connection) {
        self.clients.insert(fd, Client::new(fd, conn));
    }

    /// Append one line to a client's output queue. Unknown descriptors
    /// are ignored.
    pub fn send_line(&mut self, fd: RawFd, line: &str) {
        if let Some(client) = self.clients.get_mut(&fd) {
            client.conn.enqueue_line(line);
        }
    }

    /// Queue a numeric reply with a trailing text parameter. The target
    /// nickname is omitted while unset, leaving the trailing text
    /// directly after the code.
    pub fn send_numeric(&mut self, fd: RawFd, response: Response, args: &[&str], text: &str) {
        let mut line = self.numeric_head(fd, response, args);
        line.push_str(" :");
        line.push_str(text);
        self.send_line(fd, &line);
    }

    /// Queue a numeric reply whose arguments stand alone, without a
    /// trailing text parameter (324, 341, and the 004 triple).
    pub fn send_numeric_plain(&mut self, fd: RawFd, response: Response, args: &[&str]) {
        let line = self.numeric_head(fd, response, args);
        self.send_line(fd, &line);
    }

    fn numeric_head(&self, fd: RawFd, response: Response, args: &[&str]) -> String {
        let mut line = format!("{:03}", response.code());
        if let Some(client) = self.clients.get(&fd) {
            if !client.nickname.is_empty() {
                line.push(' ');
                line.push_str(&client.nickname);
            }
        }
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Broadcast a line to a channel roster in insertion order. The
    /// roster is snapshotted first; broadcast bodies must never observe
    /// membership mutation.
    pub fn broadcast(&mut self, channel: &str, line: &str, except: Option<RawFd>) {
        let members = match self.channels.get(channel) {
            Some(chan) => chan.members().to_vec(),
            None => return,
        };
        for fd in members {
            if Some(fd) != except {
                self.send_line(fd, line);
            }
        }
    }

    /// Nickname lookup, ASCII case-insensitive.
    pub fn find_by_nick(&self, nick: &str) -> Option<RawFd> {
        self.clients.iter().find_map(|(&fd, client)| {
            (!client.nickname.is_empty() && client.nickname.eq_ignore_ascii_case(nick))
                .then_some(fd)
        })
    }

    /// True when another client already holds `nick`.
    pub fn nick_in_use(&self, nick: &str, except: RawFd) -> bool {
        self.clients
            .iter()
            .any(|(&fd, client)| fd != except && client.nickname.eq_ignore_ascii_case(nick))
    }

    /// Everyone who should hear about an event on this client: the
    /// client itself plus the members of every channel it joined, in
    /// ascending descriptor order.
    pub fn shared_channel_audience(&self, fd: RawFd) -> Vec<RawFd> {
        let mut audience = BTreeSet::new();
        audience.insert(fd);
        if let Some(client) = self.clients.get(&fd) {
            for name in &client.channels {
                if let Some(chan) = self.channels.get(name) {
                    audience.extend(chan.members().iter().copied());
                }
            }
        }
        audience.into_iter().collect()
    }

    /// NAMES payload: roster order, `@` ahead of operator nicks. The
    /// trailing space is part of the reply format.
    pub fn names_list(&self, channel: &Channel) -> String {
        let mut out = String::new();
        for &fd in channel.members() {
            let Some(member) = self.clients.get(&fd) else {
                continue;
            };
            if channel.is_operator(fd) {
                out.push('@');
            }
            out.push_str(&member.nickname);
            out.push(' ');
        }
        out
    }

    /// Remove a client from one channel, dropping the channel once its
    /// roster empties.
    pub fn part_channel(&mut self, fd: RawFd, name: &str) {
        if let Some(chan) = self.channels.get_mut(name) {
            chan.remove_member(fd);
            if chan.is_empty() {
                self.channels.remove(name);
                debug!(channel = %name, "empty channel collected");
            }
        }
        if let Some(client) = self.clients.get_mut(&fd) {
            client.channels.retain(|c| c != name);
        }
    }

    /// Tear a client out of the state: QUIT is broadcast to every
    /// channel it joined, membership is unlinked, and empty channels are
    /// collected. The client is handed back so the caller can flush and
    /// close its socket.
    pub fn remove_client(&mut self, fd: RawFd) -> Option<Client> {
        let (prefix, joined) = {
            let client = self.clients.get(&fd)?;
            (client.prefix(), client.channels.clone())
        };
        let quit = format!("{} QUIT :Connection closed", prefix);
        for name in joined {
            self.broadcast(&name, &quit, Some(fd));
            self.part_channel(fd, &name);
        }
        // Invitations are keyed by descriptor; scrub them so a reused fd
        // cannot inherit one.
        for chan in self.channels.values_mut() {
            chan.revoke_invite(fd);
        }
        self.clients.remove(&fd)
    }

    /// Soonest registration deadline, as a poll timeout.
    pub fn next_registration_deadline(&self, now: Instant) -> Option<Duration> {
        self.clients
            .values()
            .filter(|c| !c.registered && !c.disconnected)
            .map(|c| (c.connected_at + REGISTRATION_TIMEOUT).saturating_duration_since(now))
            .min()
    }

    /// Flag unregistered clients that outlived the grace period.
    pub fn sweep_registration_timeouts(&mut self, now: Instant) {
        let expired: Vec<RawFd> = self
            .clients
            .values()
            .filter(|c| {
                !c.registered
                    && !c.disconnected
                    && now.duration_since(c.connected_at) >= REGISTRATION_TIMEOUT
            })
            .map(Client::fd)
            .collect();
        for fd in expired {
            info!(fd, "registration timeout");
            self.send_line(fd, "ERROR :Registration timeout");
            if let Some(client) = self.clients.get_mut(&fd) {
                client.mark_disconnected();
            }
        }
    }
}
