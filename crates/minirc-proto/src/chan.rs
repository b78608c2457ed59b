//! Channel name validation.

/// Maximum channel name length, prefix included (RFC 1459).
pub const CHANNEL_MAX_LEN: usize = 50;

/// Extension trait for checking if a string is a valid IRC channel name.
pub trait ChannelExt {
    /// Valid channel names start with `#`, are at most fifty characters,
    /// and are free of spaces, commas, and control characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for &str {
    fn is_channel_name(&self) -> bool {
        let Some(body) = self.strip_prefix('#') else {
            return false;
        };
        if self.len() > CHANNEL_MAX_LEN {
            return false;
        }
        body.chars()
            .all(|c| c != ' ' && c != ',' && c != '\x07' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
