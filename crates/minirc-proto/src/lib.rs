//! # minirc-proto
//!
//! Wire grammar for the minircd IRC server.
//!
//! This crate covers the protocol surface only: parsing one line into
//! `[prefix] command params` form, the numeric response codes the server
//! emits, and validation helpers for nicknames and channel names. It does
//! no I/O and holds no connection state.
//!
//! ## Parsing
//!
//! ```rust
//! use minirc_proto::Message;
//!
//! let msg: Message = "PRIVMSG #rust :Hello, world!".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.params, vec!["#rust", "Hello, world!"]);
//! ```

pub mod chan;
pub mod error;
pub mod message;
pub mod nick;
pub mod response;

pub use self::chan::ChannelExt;
pub use self::error::MessageParseError;
pub use self::message::Message;
pub use self::nick::NickExt;
pub use self::response::Response;
