//! Formatted chat lines, the unit stored in history and fanned out to clients.

use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::DisplayName;

/// Timestamp layout used in chat message prefixes (second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Presence change announced to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// A session completed the name handshake.
    Joined,
    /// A session went away.
    Left,
}

impl Presence {
    /// Returns the verb used in the announcement template.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully formatted line, exactly as clients receive it (without the
/// trailing line terminator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine(String);

impl ChatLine {
    /// Formats a chat message: `[<timestamp>][<sender>]: <text>`.
    pub fn message<Tz>(at: &DateTime<Tz>, sender: &DisplayName, text: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(format!(
            "[{}][{}]: {}",
            at.format(TIMESTAMP_FORMAT),
            sender,
            text
        ))
    }

    /// Formats a presence announcement: `<name>: has <joined|left> our chat...`.
    pub fn announcement(name: &DisplayName, presence: Presence) -> Self {
        Self(format!("{name}: has {presence} our chat..."))
    }

    /// Returns the formatted text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChatLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
