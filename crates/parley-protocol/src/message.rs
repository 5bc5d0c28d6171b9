//! Protocol message types.

use std::fmt;

use parley_core::{ChatLine, DisplayName};

/// Sent immediately on connect. Deliberately not newline-terminated so the
/// client types its name on the same line.
pub const NAME_PROMPT: &str = "[ENTER YOUR NAME]: ";

/// Sent when the requested name collides with a registered one.
pub const NAME_TAKEN: &str = "Username is already taken. Please try again.\n";

/// Terminator appended to every broadcast and replayed line.
pub const LINE_TERMINATOR: &str = "\n";

/// Text sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Name prompt.
    NamePrompt,

    /// Rejection of a colliding name; the connection closes afterwards.
    NameTaken,

    /// Greeting after successful registration.
    Welcome(DisplayName),

    /// A replayed or broadcast chat line.
    Line(ChatLine),
}

impl ServerMessage {
    /// Creates a welcome message.
    pub fn welcome(name: impl Into<DisplayName>) -> Self {
        Self::Welcome(name.into())
    }

    /// Creates a chat line message.
    pub fn line(line: ChatLine) -> Self {
        Self::Line(line)
    }
}

/// Renders the exact bytes put on the wire.
impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamePrompt => f.write_str(NAME_PROMPT),
            Self::NameTaken => f.write_str(NAME_TAKEN),
            Self::Welcome(name) => write!(f, "Welcome to the chat, {name}!{LINE_TERMINATOR}"),
            Self::Line(line) => write!(f, "{line}{LINE_TERMINATOR}"),
        }
    }
}

/// One line of client input after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// Nothing but whitespace; ignored by the relay.
    Blank,

    /// A chat message, with surrounding whitespace removed.
    Chat(String),
}

impl ClientLine {
    /// Classifies a raw input line.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            Self::Blank
        } else {
            Self::Chat(text.to_string())
        }
    }
}
