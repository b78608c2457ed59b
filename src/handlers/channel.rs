//! Channel membership commands: JOIN, PART, TOPIC, MODE, INVITE.

use std::os::fd::RawFd;

use minirc_proto::{ChannelExt, Response};
use tracing::{debug, info};

use crate::error::{HandlerError, HandlerResult};
use crate::state::{Channel, ServerState};

pub fn join(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let name = params.first().ok_or(HandlerError::NeedMoreParams)?.clone();
    if !name.as_str().is_channel_name() {
        return Err(HandlerError::NoSuchChannel(name));
    }
    let key = params.get(1).map(String::as_str).unwrap_or("");

    match state.channels.get_mut(&name) {
        None => {
            state.channels.insert(name.clone(), Channel::new(&name, fd));
            info!(channel = %name, fd, "channel created");
        }
        Some(chan) => {
            if chan.is_member(fd) {
                // Re-JOIN is a no-op.
                return Ok(());
            }
            if chan.invite_only && !chan.is_invited(fd) {
                return Err(HandlerError::InviteOnlyChan(name));
            }
            if !chan.key.is_empty() && key != chan.key {
                return Err(HandlerError::BadChannelKey(name));
            }
            if chan.user_limit > 0 && chan.member_count() as u32 >= chan.user_limit {
                return Err(HandlerError::ChannelIsFull(name));
            }
            chan.add_member(fd);
            chan.revoke_invite(fd);
        }
    }

    let Some(client) = state.clients.get_mut(&fd) else {
        return Ok(());
    };
    if !client.is_in(&name) {
        client.channels.push(name.clone());
    }
    let prefix = client.prefix();

    state.broadcast(&name, &format!("{} JOIN {}", prefix, name), None);
    send_topic_reply(state, fd, &name);
    send_names_reply(state, fd, &name);
    Ok(())
}

pub fn part(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let name = params.first().ok_or(HandlerError::NeedMoreParams)?.clone();
    let is_member = match state.channels.get(&name) {
        Some(chan) => chan.is_member(fd),
        None => return Err(HandlerError::NoSuchChannel(name)),
    };
    if !is_member {
        return Err(HandlerError::NotOnChannel(name));
    }

    let prefix = state.clients.get(&fd).map(|c| c.prefix()).unwrap_or_default();
    state.broadcast(&name, &format!("{} PART {}", prefix, name), None);
    state.part_channel(fd, &name);
    Ok(())
}

pub fn topic(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let name = params.first().ok_or(HandlerError::NeedMoreParams)?.clone();
    let (is_member, restricted, is_op) = match state.channels.get(&name) {
        Some(chan) => (chan.is_member(fd), chan.topic_restricted, chan.is_operator(fd)),
        None => return Err(HandlerError::NoSuchChannel(name)),
    };
    if !is_member {
        return Err(HandlerError::NotOnChannel(name));
    }

    let Some(new_topic) = params.get(1) else {
        send_topic_reply(state, fd, &name);
        return Ok(());
    };
    if restricted && !is_op {
        return Err(HandlerError::ChanOpPrivsNeeded(name));
    }

    if let Some(chan) = state.channels.get_mut(&name) {
        chan.topic = new_topic.clone();
    }
    debug!(channel = %name, "topic changed");
    let prefix = state.clients.get(&fd).map(|c| c.prefix()).unwrap_or_default();
    state.broadcast(&name, &format!("{} TOPIC {} :{}", prefix, name, new_topic), None);
    Ok(())
}

pub fn mode(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let name = params.first().ok_or(HandlerError::NeedMoreParams)?.clone();
    if !name.as_str().is_channel_name() || !state.channels.contains_key(&name) {
        return Err(HandlerError::NoSuchChannel(name));
    }

    let Some(modes) = params.get(1) else {
        let mode_string = state
            .channels
            .get(&name)
            .map(|c| c.mode_string())
            .unwrap_or_default();
        let mut args = vec![name.as_str()];
        args.extend(mode_string.split(' '));
        state.send_numeric_plain(fd, Response::RPL_CHANNELMODEIS, &args);
        return Ok(());
    };

    let (is_member, is_op) = state
        .channels
        .get(&name)
        .map(|c| (c.is_member(fd), c.is_operator(fd)))
        .unwrap_or((false, false));
    if !is_member {
        return Err(HandlerError::NotOnChannel(name));
    }
    if !is_op {
        return Err(HandlerError::ChanOpPrivsNeeded(name));
    }

    let applied = apply_modes(state, &name, modes, &params[2..])?;
    if !applied.is_empty() {
        let prefix = state.clients.get(&fd).map(|c| c.prefix()).unwrap_or_default();
        state.broadcast(&name, &format!("{} MODE {} {}", prefix, name, applied), None);
    }
    Ok(())
}

/// Apply a mode change string; returns the rendered change for the
/// channel broadcast, parameters included.
fn apply_modes(
    state: &mut ServerState,
    name: &str,
    modes: &str,
    args: &[String],
) -> Result<String, HandlerError> {
    let mut arg_iter = args.iter();
    let mut adding = true;
    let mut letters = String::new();
    let mut letter_args: Vec<String> = Vec::new();
    let mut last_sign = None;

    for letter in modes.chars() {
        match letter {
            '+' => adding = true,
            '-' => adding = false,
            'i' | 't' | 'k' | 'l' | 'o' => {
                let needs_arg = matches!((letter, adding), ('k', true) | ('l', true) | ('o', _));
                let arg = if needs_arg {
                    Some(arg_iter.next().ok_or(HandlerError::NeedMoreParams)?.clone())
                } else {
                    None
                };
                if !apply_one(state, name, adding, letter, arg.as_deref())? {
                    continue;
                }
                let sign = if adding { '+' } else { '-' };
                if last_sign != Some(sign) {
                    letters.push(sign);
                    last_sign = Some(sign);
                }
                letters.push(letter);
                if let Some(arg) = arg {
                    letter_args.push(arg);
                }
            }
            // Unsupported letters are ignored.
            _ => {}
        }
    }

    let mut rendered = letters;
    for arg in letter_args {
        rendered.push(' ');
        rendered.push_str(&arg);
    }
    Ok(rendered)
}

/// Returns true when the change took effect.
fn apply_one(
    state: &mut ServerState,
    name: &str,
    adding: bool,
    letter: char,
    arg: Option<&str>,
) -> Result<bool, HandlerError> {
    match letter {
        'o' => {
            let target_nick = arg.unwrap_or_default();
            let not_in_channel = || HandlerError::UserNotInChannel {
                nick: target_nick.to_string(),
                channel: name.to_string(),
            };
            let target_fd = state.find_by_nick(target_nick).ok_or_else(not_in_channel)?;
            let Some(chan) = state.channels.get_mut(name) else {
                return Ok(false);
            };
            if !chan.is_member(target_fd) {
                return Err(not_in_channel());
            }
            if adding {
                chan.add_operator(target_fd);
            } else {
                chan.remove_operator(target_fd);
            }
            Ok(true)
        }
        'l' if adding => {
            let limit: u32 = arg
                .unwrap_or_default()
                .parse()
                .map_err(|_| HandlerError::NeedMoreParams)?;
            if let Some(chan) = state.channels.get_mut(name) {
                chan.user_limit = limit;
            }
            Ok(true)
        }
        'l' => {
            if let Some(chan) = state.channels.get_mut(name) {
                chan.user_limit = 0;
            }
            Ok(true)
        }
        'k' => {
            if let Some(chan) = state.channels.get_mut(name) {
                if adding {
                    chan.key = arg.unwrap_or_default().to_string();
                } else {
                    chan.key.clear();
                }
            }
            Ok(true)
        }
        'i' => {
            if let Some(chan) = state.channels.get_mut(name) {
                chan.invite_only = adding;
            }
            Ok(true)
        }
        't' => {
            if let Some(chan) = state.channels.get_mut(name) {
                chan.topic_restricted = adding;
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub fn invite(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    if params.len() < 2 {
        return Err(HandlerError::NeedMoreParams);
    }
    let target_nick = params[0].clone();
    let name = params[1].clone();

    let (is_member, invite_only, is_op) = match state.channels.get(&name) {
        Some(chan) => (chan.is_member(fd), chan.invite_only, chan.is_operator(fd)),
        None => return Err(HandlerError::NoSuchChannel(name)),
    };
    if !is_member {
        return Err(HandlerError::NotOnChannel(name));
    }
    if invite_only && !is_op {
        return Err(HandlerError::ChanOpPrivsNeeded(name));
    }
    let Some(target_fd) = state.find_by_nick(&target_nick) else {
        return Err(HandlerError::NoSuchNick(target_nick));
    };
    let target_is_member = state
        .channels
        .get(&name)
        .map(|c| c.is_member(target_fd))
        .unwrap_or(false);
    if target_is_member {
        return Err(HandlerError::UserOnChannel {
            nick: target_nick,
            channel: name,
        });
    }

    if let Some(chan) = state.channels.get_mut(&name) {
        chan.invite(target_fd);
    }
    debug!(channel = %name, target = %target_nick, "invitation recorded");
    let prefix = state.clients.get(&fd).map(|c| c.prefix()).unwrap_or_default();
    state.send_numeric_plain(fd, Response::RPL_INVITING, &[&target_nick, &name]);
    state.send_line(
        target_fd,
        &format!("{} INVITE {} :{}", prefix, target_nick, name),
    );
    Ok(())
}

/// 332 or 331 for a channel the client can see.
fn send_topic_reply(state: &mut ServerState, fd: RawFd, name: &str) {
    let topic = match state.channels.get(name) {
        Some(chan) => chan.topic.clone(),
        None => return,
    };
    if topic.is_empty() {
        state.send_numeric(fd, Response::RPL_NOTOPIC, &[name], "No topic is set");
    } else {
        state.send_numeric(fd, Response::RPL_TOPIC, &[name], &topic);
    }
}

/// 353 and 366 for one channel.
fn send_names_reply(state: &mut ServerState, fd: RawFd, name: &str) {
    let names = match state.channels.get(name) {
        Some(chan) => state.names_list(chan),
        None => return,
    };
    state.send_numeric(fd, Response::RPL_NAMREPLY, &["=", name], &names);
    state.send_numeric(fd, Response::RPL_ENDOFNAMES, &[name], "End of /NAMES list");
}
