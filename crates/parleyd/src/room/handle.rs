//! Client interface for interacting with the RoomActor.
//!
//! The `RoomHandle` provides a cheap-to-clone interface for sending commands
//! to the room actor and subscribing to room events.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RoomError::ChannelClosed`

use tokio::sync::{broadcast, mpsc, oneshot};

use parley_core::{ChatLine, ClientId, DisplayName, Presence};

use super::commands::{Delivery, RoomCommand, RoomError, RoomEvent};
use super::SessionWriter;

// ============================================================================
// Room Handle
// ============================================================================

/// Handle for interacting with the room actor.
///
/// This is a cheap-to-clone handle that can be shared across connection
/// tasks. All methods are async and wait for the actor's answer.
///
/// # Usage
///
/// ```ignore
/// let room = spawn_room();
///
/// room.replay_history(writer.clone()).await?;
/// room.join(client_id, name.clone(), writer).await?;
/// room.broadcast(name, "hello".to_string()).await?;
/// ```
#[derive(Clone)]
pub struct RoomHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RoomCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<RoomEvent>,
}

impl RoomHandle {
    /// Create a new room handle.
    pub fn new(
        sender: mpsc::Sender<RoomCommand>,
        event_sender: broadcast::Sender<RoomEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Write the full history to a client that has not joined yet.
    ///
    /// Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// - `RoomError::Write` if a line could not be written
    /// - `RoomError::ChannelClosed` if the actor has shut down
    pub async fn replay_history(&self, writer: SessionWriter) -> Result<usize, RoomError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RoomCommand::ReplayHistory {
                writer,
                respond_to: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;

        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    /// Register a client under a display name.
    ///
    /// The uniqueness check and the insert happen in the same actor step.
    ///
    /// # Errors
    ///
    /// - `RoomError::NameTaken` if the name is in use (case-insensitive)
    /// - `RoomError::AlreadyJoined` if the client is already registered
    /// - `RoomError::ChannelClosed` if the actor has shut down
    pub async fn join(
        &self,
        client_id: ClientId,
        name: DisplayName,
        writer: SessionWriter,
    ) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RoomCommand::Join {
                client_id,
                name,
                writer,
                respond_to: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;

        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    /// Remove a client from the roster.
    ///
    /// Returns the name it was registered under, or `None` if it was never
    /// registered or the actor is gone.
    pub async fn leave(&self, client_id: ClientId) -> Option<DisplayName> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RoomCommand::Leave {
                client_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Publish a chat message from `sender` to every member.
    ///
    /// # Errors
    ///
    /// - `RoomError::ChannelClosed` if the actor has shut down
    pub async fn broadcast(
        &self,
        sender: DisplayName,
        text: String,
    ) -> Result<Delivery, RoomError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RoomCommand::Broadcast {
                sender,
                text,
                respond_to: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;

        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    /// Publish a joined/left announcement.
    ///
    /// `except` names a member that should not receive the line.
    ///
    /// # Errors
    ///
    /// - `RoomError::ChannelClosed` if the actor has shut down
    pub async fn announce(
        &self,
        name: DisplayName,
        presence: Presence,
        except: Option<ClientId>,
    ) -> Result<Delivery, RoomError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RoomCommand::Announce {
                name,
                presence,
                except,
                respond_to: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;

        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    /// Check whether a name collides with a current member.
    ///
    /// Returns `false` if communication with the actor fails.
    pub async fn is_name_taken(&self, name: DisplayName) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RoomCommand::IsNameTaken {
                name,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Get the roster in join order.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn members(&self) -> Vec<(ClientId, DisplayName)> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RoomCommand::GetMembers { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Get the number of registered members.
    pub async fn member_count(&self) -> usize {
        self.members().await.len()
    }

    /// Get the history, oldest first.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn history(&self) -> Vec<ChatLine> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RoomCommand::GetHistory { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Subscribe to room events.
    ///
    /// This is a synchronous operation - it doesn't communicate with the actor.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
