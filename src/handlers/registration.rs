//! PASS, NICK, and USER: the registration handshake.
//!
//! The order is password first, then nickname and username in either
//! order; USER before a validated PASS is refused outright. Completion
//! latches the client REGISTERED and greets it with 001 through 004
//! followed by the missing-MOTD notice.

use std::os::fd::RawFd;

use minirc_proto::{NickExt, Response};
use tracing::info;

use crate::error::{HandlerError, HandlerResult};
use crate::state::{ServerState, SERVER_NAME, SERVER_VERSION};

pub fn pass(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let Some(client) = state.clients.get(&fd) else {
        return Ok(());
    };
    if client.registered {
        return Err(HandlerError::AlreadyRegistered);
    }
    let supplied = params.first().ok_or(HandlerError::NeedMoreParams)?;
    if !state.check_password(supplied) {
        // A failed PASS costs the connection.
        if let Some(client) = state.clients.get_mut(&fd) {
            client.mark_disconnected();
        }
        return Err(HandlerError::PasswordMismatch);
    }
    if let Some(client) = state.clients.get_mut(&fd) {
        client.password_validated = true;
    }
    try_complete(state, fd);
    Ok(())
}

pub fn nick(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let new_nick = match params.first() {
        Some(nick) if !nick.is_empty() => nick.clone(),
        _ => return Err(HandlerError::NoNicknameGiven),
    };
    if !new_nick.as_str().is_valid_nick() {
        return Err(HandlerError::ErroneousNickname(new_nick));
    }
    if state.nick_in_use(&new_nick, fd) {
        return Err(HandlerError::NicknameInUse(new_nick));
    }

    let Some(client) = state.clients.get_mut(&fd) else {
        return Ok(());
    };
    if client.registered {
        // Nick change: announce to the client and everyone sharing a
        // channel with it, under the old prefix.
        let notice = format!("{} NICK :{}", client.prefix(), new_nick);
        client.nickname = new_nick;
        for target in state.shared_channel_audience(fd) {
            state.send_line(target, &notice);
        }
    } else {
        client.nickname = new_nick;
        try_complete(state, fd);
    }
    Ok(())
}

pub fn user(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let Some(client) = state.clients.get(&fd) else {
        return Ok(());
    };
    if client.registered {
        return Err(HandlerError::AlreadyRegistered);
    }
    if !client.password_validated {
        return Err(HandlerError::PasswordMismatch);
    }
    if params.len() < 4 {
        return Err(HandlerError::NeedMoreParams);
    }
    let username = params[0].clone();
    if let Some(client) = state.clients.get_mut(&fd) {
        client.username = username;
    }
    try_complete(state, fd);
    Ok(())
}

/// Latch REGISTERED once password, nickname, and username are all in,
/// then send the welcome block in fixed order.
fn try_complete(state: &mut ServerState, fd: RawFd) {
    let Some(client) = state.clients.get_mut(&fd) else {
        return;
    };
    if client.registered
        || !client.password_validated
        || client.nickname.is_empty()
        || client.username.is_empty()
    {
        return;
    }
    client.registered = true;
    let nick = client.nickname.clone();
    let username = client.username.clone();
    let hostname = client.hostname.clone();
    info!(fd, nick = %nick, "registration complete");

    let welcome = format!(
        "Welcome to the Internet Relay Network {}!{}@{}",
        nick, username, hostname
    );
    state.send_numeric(fd, Response::RPL_WELCOME, &[], &welcome);
    state.send_numeric(
        fd,
        Response::RPL_YOURHOST,
        &[],
        &format!("Your host is {}, running version {}", SERVER_NAME, SERVER_VERSION),
    );
    state.send_numeric(fd, Response::RPL_CREATED, &[], "This server was created today");
    state.send_numeric_plain(
        fd,
        Response::RPL_MYINFO,
        &[SERVER_NAME, SERVER_VERSION, "o", "itkl"],
    );
    state.send_numeric(fd, Response::ERR_NOMOTD, &[], "MOTD File is missing");
}
