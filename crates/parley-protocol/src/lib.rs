//! Parley Protocol - Line-oriented text protocol
//!
//! This crate provides the exact texts the relay sends to clients and the
//! framing used to read client input. There is no framing beyond the
//! newline: one line is one name (during the handshake) or one chat message.

pub mod codec;
pub mod message;

pub use codec::{write_message, LineReader, ProtocolError};
pub use message::{ClientLine, ServerMessage, LINE_TERMINATOR, NAME_PROMPT, NAME_TAKEN};
