//! PRIVMSG delivery.

use std::os::fd::RawFd;

use crate::error::{HandlerError, HandlerResult};
use crate::state::ServerState;

/// Channel targets fan out to every member except the sender; anything
/// else is a nickname for direct delivery.
pub fn privmsg(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    if params.len() < 2 {
        return Err(HandlerError::NeedMoreParams);
    }
    let target = params[0].clone();
    let text = params[1].clone();
    let prefix = state.clients.get(&fd).map(|c| c.prefix()).unwrap_or_default();
    let line = format!("{} PRIVMSG {} :{}", prefix, target, text);

    if target.starts_with('#') {
        if !state.channels.contains_key(&target) {
            return Err(HandlerError::NoSuchChannel(target));
        }
        state.broadcast(&target, &line, Some(fd));
    } else {
        let Some(target_fd) = state.find_by_nick(&target) else {
            return Err(HandlerError::NoSuchNick(target));
        };
        state.send_line(target_fd, &line);
    }
    Ok(())
}
