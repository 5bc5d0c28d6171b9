//! Room actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RoomActor`:
//! - `RoomCommand`: Commands sent to the actor
//! - `RoomError`: Errors that can occur during room operations
//! - `RoomEvent`: Events published by the room for observers
//! - `Delivery`: Outcome of one fan-out

use parley_core::{ChatLine, ClientId, DisplayName, Presence};
use thiserror::Error;
use tokio::sync::oneshot;

use super::SessionWriter;

// ============================================================================
// Room Commands
// ============================================================================

/// Commands sent to the room actor.
///
/// Each command that produces a result carries a oneshot channel for the
/// response, so callers wait until the actor has fully processed it.
pub enum RoomCommand {
    /// Write the entire history to a client that has not joined yet.
    ///
    /// Stops at the first failed write and reports it.
    ReplayHistory {
        /// Destination stream
        writer: SessionWriter,
        /// Number of lines written, or the write failure
        respond_to: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// Check the name and register the client in a single step.
    ///
    /// # Errors
    /// - `RoomError::NameTaken` if a member already uses the name (any case)
    /// - `RoomError::AlreadyJoined` if this client id is already a member
    Join {
        /// Identity of the joining connection
        client_id: ClientId,
        /// Requested display name
        name: DisplayName,
        /// Stream the room will fan lines out to
        writer: SessionWriter,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a client from the roster.
    ///
    /// Removing a client that never joined is a no-op and yields `None`.
    Leave {
        /// Identity of the leaving connection
        client_id: ClientId,
        /// Name the client was registered under, if any
        respond_to: oneshot::Sender<Option<DisplayName>>,
    },

    /// Format a chat message, append it to history and fan it out.
    Broadcast {
        /// Name shown as the sender
        sender: DisplayName,
        /// Message text, already trimmed
        text: String,
        /// Channel to send the delivery report
        respond_to: oneshot::Sender<Delivery>,
    },

    /// Append a presence announcement to history and fan it out.
    Announce {
        /// Name the announcement is about
        name: DisplayName,
        /// Joined or left
        presence: Presence,
        /// Member that should not receive the line (the joiner itself)
        except: Option<ClientId>,
        /// Channel to send the delivery report
        respond_to: oneshot::Sender<Delivery>,
    },

    /// Check whether a name collides with a current member.
    IsNameTaken {
        /// Candidate name
        name: DisplayName,
        /// Channel to send the answer
        respond_to: oneshot::Sender<bool>,
    },

    /// Snapshot of the roster, in join order.
    GetMembers {
        respond_to: oneshot::Sender<Vec<(ClientId, DisplayName)>>,
    },

    /// Snapshot of the history, oldest first.
    GetHistory {
        respond_to: oneshot::Sender<Vec<ChatLine>>,
    },
}

// ============================================================================
// Room Errors
// ============================================================================

/// Errors that can occur during room operations.
#[derive(Debug, Clone, Error)]
pub enum RoomError {
    /// Another member already uses this name (case-insensitive).
    #[error("name already taken: {0}")]
    NameTaken(DisplayName),

    /// The client id is already registered.
    #[error("client already joined: {0}")]
    AlreadyJoined(ClientId),

    /// Writing to a client failed.
    #[error("write failed: {0}")]
    Write(String),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Delivery Report
// ============================================================================

/// Outcome of publishing one line to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The line as appended to history and written to members
    pub line: ChatLine,
    /// Members the line was written to
    pub delivered: usize,
    /// Members whose write failed
    pub failed: usize,
}

// ============================================================================
// Room Events
// ============================================================================

/// Events published by the room to observers.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A client joined the roster.
    Joined {
        client_id: ClientId,
        name: DisplayName,
    },

    /// A client asked for a name that was already taken.
    Rejected {
        client_id: ClientId,
        name: DisplayName,
    },

    /// A client was removed from the roster.
    Left {
        client_id: ClientId,
        name: DisplayName,
    },

    /// A line was appended to history and fanned out.
    Published {
        line: ChatLine,
        delivered: usize,
        failed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_display() {
        let err = RoomError::NameTaken(DisplayName::new("Bob"));
        assert_eq!(err.to_string(), "name already taken: Bob");

        let err = RoomError::AlreadyJoined(ClientId::new(4));
        assert_eq!(err.to_string(), "client already joined: client-4");

        let err = RoomError::Write("broken pipe".to_string());
        assert_eq!(err.to_string(), "write failed: broken pipe");

        let err = RoomError::ChannelClosed;
        assert_eq!(err.to_string(), "response channel closed");
    }

    #[test]
    fn test_room_event_variants() {
        let joined = RoomEvent::Joined {
            client_id: ClientId::new(1),
            name: DisplayName::new("a"),
        };
        let _cloned = joined.clone();

        let published = RoomEvent::Published {
            line: ChatLine::announcement(&DisplayName::new("a"), Presence::Left),
            delivered: 2,
            failed: 0,
        };
        assert!(matches!(
            published.clone(),
            RoomEvent::Published { delivered: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_command_channel_closed_error() {
        let (tx, rx) = oneshot::channel::<Result<(), RoomError>>();
        drop(tx);

        let result = rx.await;
        assert!(result.is_err());
    }
}
