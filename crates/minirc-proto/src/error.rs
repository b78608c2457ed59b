//! Protocol parse errors.

use thiserror::Error;

/// Errors produced while parsing a single IRC line.
///
/// The server drops unparseable frames silently, so these errors never
/// reach a client; they exist for the parser's callers and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    #[error("empty message")]
    EmptyMessage,

    /// A `:`-prefix with no following space leaves no room for a command.
    #[error("prefix without a following command")]
    UnterminatedPrefix,

    #[error("message has no command")]
    MissingCommand,
}
