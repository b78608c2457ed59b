//! Command dispatch.
//!
//! Framed lines arrive here as parsed messages. The registration gate
//! rejects everything but PASS, NICK, USER, and QUIT until the handshake
//! completes; after that each command routes to its handler. Handler
//! errors become numeric replies on the sender's queue.

pub mod channel;
pub mod connection;
pub mod messaging;
pub mod registration;

use std::os::fd::RawFd;

use minirc_proto::Message;
use tracing::trace;

use crate::error::HandlerError;
use crate::state::ServerState;

/// Route one parsed command. Unknown descriptors are ignored.
pub fn dispatch(state: &mut ServerState, fd: RawFd, msg: Message) {
    let Some(client) = state.clients.get(&fd) else {
        return;
    };
    trace!(fd, command = %msg.command, "dispatch");

    let registered = client.registered;
    let result = match msg.command.as_str() {
        "PASS" => registration::pass(state, fd, &msg.params),
        "NICK" => registration::nick(state, fd, &msg.params),
        "USER" => registration::user(state, fd, &msg.params),
        "QUIT" => connection::quit(state, fd, &msg.params),
        _ if !registered => Err(HandlerError::NotRegistered),
        "JOIN" => channel::join(state, fd, &msg.params),
        "PART" => channel::part(state, fd, &msg.params),
        "TOPIC" => channel::topic(state, fd, &msg.params),
        "MODE" => channel::mode(state, fd, &msg.params),
        "INVITE" => channel::invite(state, fd, &msg.params),
        "PRIVMSG" => messaging::privmsg(state, fd, &msg.params),
        "PING" => connection::ping(state, fd, &msg.params),
        other => Err(HandlerError::UnknownCommand(other.to_string())),
    };

    if let Err(err) = result {
        err.send_to(state, fd, &msg.command);
    }
}
