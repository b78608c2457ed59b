//! Connection-scoped commands: QUIT and PING.

use std::os::fd::RawFd;

use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::state::ServerState;

/// QUIT works in any registration state. The handler only flags the
/// client; the QUIT broadcast and channel collection happen during
/// end-of-iteration removal.
pub fn quit(state: &mut ServerState, fd: RawFd, _params: &[String]) -> HandlerResult {
    if let Some(client) = state.clients.get_mut(&fd) {
        debug!(fd, nick = %client.nickname, "client quit");
        client.mark_disconnected();
    }
    Ok(())
}

pub fn ping(state: &mut ServerState, fd: RawFd, params: &[String]) -> HandlerResult {
    let token = params.first().ok_or(HandlerError::NeedMoreParams)?;
    let pong = format!("PONG :{}", token);
    state.send_line(fd, &pong);
    Ok(())
}
