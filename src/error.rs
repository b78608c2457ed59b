//! Handler errors and their numeric replies.
//!
//! Command handlers return [`HandlerError`] for every protocol
//! violation; dispatch converts the error into the matching numeric
//! reply on the offending client's queue. Errors never disconnect by
//! themselves — the PASS handler flags the client separately when the
//! password fails.

use std::os::fd::RawFd;

use minirc_proto::Response;
use thiserror::Error;

use crate::state::ServerState;

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors that can occur during command handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("no nickname given")]
    NoNicknameGiven,

    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("password incorrect")]
    PasswordMismatch,

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("channel operator privileges needed on {0}")]
    ChanOpPrivsNeeded(String),

    #[error("{nick} is not on {channel}")]
    UserNotInChannel { nick: String, channel: String },

    #[error("{nick} is already on {channel}")]
    UserOnChannel { nick: String, channel: String },

    #[error("cannot join {0} (+i)")]
    InviteOnlyChan(String),

    #[error("cannot join {0} (+k)")]
    BadChannelKey(String),

    #[error("cannot join {0} (+l)")]
    ChannelIsFull(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl HandlerError {
    /// The numeric this error maps to.
    pub fn response(&self) -> Response {
        match self {
            Self::NeedMoreParams => Response::ERR_NEEDMOREPARAMS,
            Self::NoNicknameGiven => Response::ERR_NONICKNAMEGIVEN,
            Self::ErroneousNickname(_) => Response::ERR_ERRONEUSNICKNAME,
            Self::NicknameInUse(_) => Response::ERR_NICKNAMEINUSE,
            Self::NotRegistered => Response::ERR_NOTREGISTERED,
            Self::AlreadyRegistered => Response::ERR_ALREADYREGISTRED,
            Self::PasswordMismatch => Response::ERR_PASSWDMISMATCH,
            Self::NoSuchNick(_) => Response::ERR_NOSUCHNICK,
            Self::NoSuchChannel(_) => Response::ERR_NOSUCHCHANNEL,
            Self::NotOnChannel(_) => Response::ERR_NOTONCHANNEL,
            Self::ChanOpPrivsNeeded(_) => Response::ERR_CHANOPRIVSNEEDED,
            Self::UserNotInChannel { .. } => Response::ERR_USERNOTINCHANNEL,
            Self::UserOnChannel { .. } => Response::ERR_USERONCHANNEL,
            Self::InviteOnlyChan(_) => Response::ERR_INVITEONLYCHAN,
            Self::BadChannelKey(_) => Response::ERR_BADCHANNELKEY,
            Self::ChannelIsFull(_) => Response::ERR_CHANNELISFULL,
            Self::UnknownCommand(_) => Response::ERR_UNKNOWNCOMMAND,
        }
    }

    /// Queue the numeric reply for this error on the offending client.
    /// `command` names the command being handled, for 461.
    pub fn send_to(&self, state: &mut ServerState, fd: RawFd, command: &str) {
        let (args, text): (Vec<&str>, &str) = match self {
            Self::NeedMoreParams => (vec![command], "Not enough parameters"),
            Self::NoNicknameGiven => (vec![], "No nickname given"),
            Self::ErroneousNickname(nick) => (vec![nick], "Erroneous nickname"),
            Self::NicknameInUse(nick) => (vec![nick], "Nickname is already in use"),
            Self::NotRegistered => (vec![], "You have not registered"),
            Self::AlreadyRegistered => (vec![], "You may not reregister"),
            Self::PasswordMismatch => (vec![], "Password incorrect"),
            Self::NoSuchNick(target) => (vec![target], "No such nick/channel"),
            Self::NoSuchChannel(chan) => (vec![chan], "No such channel"),
            Self::NotOnChannel(chan) => (vec![chan], "You're not on that channel"),
            Self::ChanOpPrivsNeeded(chan) => (vec![chan], "You're not channel operator"),
            Self::UserNotInChannel { nick, channel } => {
                (vec![nick, channel], "They aren't on that channel")
            }
            Self::UserOnChannel { nick, channel } => {
                (vec![nick, channel], "is already on channel")
            }
            Self::InviteOnlyChan(chan) => (vec![chan], "Cannot join channel (+i)"),
            Self::BadChannelKey(chan) => (vec![chan], "Cannot join channel (+k)"),
            Self::ChannelIsFull(chan) => (vec![chan], "Cannot join channel (+l)"),
            Self::UnknownCommand(cmd) => (vec![cmd], "Unknown command"),
        };
        state.send_numeric(fd, self.response(), &args, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_their_numerics() {
        assert_eq!(
            HandlerError::NotRegistered.response(),
            Response::ERR_NOTREGISTERED
        );
        assert_eq!(
            HandlerError::PasswordMismatch.response(),
            Response::ERR_PASSWDMISMATCH
        );
        assert_eq!(
            HandlerError::NicknameInUse("alice".into()).response(),
            Response::ERR_NICKNAMEINUSE
        );
        assert_eq!(
            HandlerError::ChanOpPrivsNeeded("#r".into()).response(),
            Response::ERR_CHANOPRIVSNEEDED
        );
    }
}
