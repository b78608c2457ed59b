//! Command-line configuration.
//!
//! The whole surface is `minircd <port> <password>`. The port must parse
//! as a decimal integer in `[1, 65535]`; anything else is a usage error
//! reported on standard error with exit code 1.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("usage: {0} <port> <password>")]
    Usage(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),
}

impl ServerConfig {
    /// Parse `argv`. The first element is the binary name, echoed back
    /// in the usage message.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self, ConfigError> {
        let binary = args.next().unwrap_or_else(|| "minircd".to_string());
        let (Some(port_arg), Some(password), None) = (args.next(), args.next(), args.next())
        else {
            return Err(ConfigError::Usage(binary));
        };
        let port: u16 = port_arg
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port_arg.clone()))?;
        if port == 0 {
            return Err(ConfigError::InvalidPort(port_arg));
        }
        Ok(Self { port, password })
    }
}
