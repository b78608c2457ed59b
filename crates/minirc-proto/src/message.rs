//! IRC message parsing.
//!
//! One message per line. Grammar:
//!
//! ```text
//! [":" prefix SP] command (SP param)* [SP ":" trailing]
//! ```
//!
//! Runs of spaces between tokens are collapsed. The trailing parameter,
//! introduced by `" :"`, keeps its internal spaces verbatim and is always
//! the last parameter.

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;

/// A parsed IRC message.
///
/// The command is normalized to upper-case ASCII during parsing. The
/// prefix, when present, is retained for completeness; this server does
/// not federate and never acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parameter at `index`, if any.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut rest = line;
        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let space = stripped
                .find(' ')
                .ok_or(MessageParseError::UnterminatedPrefix)?;
            prefix = Some(stripped[..space].to_string());
            rest = stripped[space + 1..].trim_start_matches(' ');
        }

        // The trailing parameter starts at the first " :" and runs to the
        // end of the line, spaces included.
        let (head, trailing) = match rest.find(" :") {
            Some(at) => (&rest[..at], Some(&rest[at + 2..])),
            None => (rest, None),
        };

        let mut tokens = head.split_ascii_whitespace();
        let command = tokens.next().ok_or(MessageParseError::MissingCommand)?;
        let mut params: Vec<String> = tokens.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Ok(Message {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for (i, param) in self.params.iter().enumerate() {
            let last = i + 1 == self.params.len();
            if last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
