//! Room actor - owns the roster and the history and processes commands.
//!
//! The RoomActor is the single owner of shared chat state. It receives
//! commands via an mpsc channel and publishes events via broadcast.
//!
//! Fan-out happens inside the actor: while a line is being written to the
//! members no other command runs, so history order and delivery order agree
//! and a name check can never race with an insert. A member that stops
//! reading stalls every later command until its write completes.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Write failures are logged and counted, never fatal
//! - Channel send failures are ignored (the requester went away)

use std::collections::BTreeMap;

use chrono::Local;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use parley_core::{ChatLine, ClientId, DisplayName, History};
use parley_protocol::ServerMessage;

use super::commands::{Delivery, RoomCommand, RoomError, RoomEvent};
use super::member::{send_message, Member, SessionWriter};

// ============================================================================
// Room Actor
// ============================================================================

/// The room actor - owns all shared chat state.
///
/// # Ownership
///
/// The actor owns:
/// - `members`: registered clients keyed by connection id, iterated in join order
/// - `history`: every published line, oldest first, never pruned
pub struct RoomActor {
    /// Command receiver
    receiver: mpsc::Receiver<RoomCommand>,

    /// Registered clients
    members: BTreeMap<ClientId, Member>,

    /// Lines published so far
    history: History,

    /// Event publisher for observers (console mirror, tests)
    event_publisher: broadcast::Sender<RoomEvent>,
}

impl RoomActor {
    /// Creates a new room actor.
    pub fn new(
        receiver: mpsc::Receiver<RoomCommand>,
        event_publisher: broadcast::Sender<RoomEvent>,
    ) -> Self {
        Self {
            receiver,
            members: BTreeMap::new(),
            history: History::new(),
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!("Room actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!(
            members = self.members.len(),
            history = self.history.len(),
            "Room actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::ReplayHistory { writer, respond_to } => {
                let result = self.handle_replay(&writer).await;
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RoomCommand::Join {
                client_id,
                name,
                writer,
                respond_to,
            } => {
                let result = self.handle_join(client_id, name, writer);
                let _ = respond_to.send(result);
            }
            RoomCommand::Leave {
                client_id,
                respond_to,
            } => {
                let result = self.handle_leave(client_id);
                let _ = respond_to.send(result);
            }
            RoomCommand::Broadcast {
                sender,
                text,
                respond_to,
            } => {
                let line = ChatLine::message(&Local::now(), &sender, &text);
                let result = self.publish(line, None).await;
                let _ = respond_to.send(result);
            }
            RoomCommand::Announce {
                name,
                presence,
                except,
                respond_to,
            } => {
                let line = ChatLine::announcement(&name, presence);
                let result = self.publish(line, except).await;
                let _ = respond_to.send(result);
            }
            RoomCommand::IsNameTaken { name, respond_to } => {
                let _ = respond_to.send(self.is_name_taken(&name));
            }
            RoomCommand::GetMembers { respond_to } => {
                let members = self
                    .members
                    .iter()
                    .map(|(id, member)| (*id, member.name.clone()))
                    .collect();
                let _ = respond_to.send(members);
            }
            RoomCommand::GetHistory { respond_to } => {
                let _ = respond_to.send(self.history.entries().to_vec());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Writes every history line to a client, oldest first.
    async fn handle_replay(&self, writer: &SessionWriter) -> Result<usize, RoomError> {
        let mut written = 0;

        for line in &self.history {
            let msg = ServerMessage::line(line.clone());
            if let Err(e) = send_message(writer, &msg).await {
                debug!(
                    written,
                    total = self.history.len(),
                    error = %e,
                    "History replay aborted"
                );
                return Err(RoomError::Write(e.to_string()));
            }
            written += 1;
        }

        Ok(written)
    }

    /// Registers a client if its name is free.
    fn handle_join(
        &mut self,
        client_id: ClientId,
        name: DisplayName,
        writer: SessionWriter,
    ) -> Result<(), RoomError> {
        if self.members.contains_key(&client_id) {
            return Err(RoomError::AlreadyJoined(client_id));
        }

        if self.is_name_taken(&name) {
            debug!(
                client_id = %client_id,
                name = %name,
                "Name already taken, rejecting join"
            );
            let _ = self.event_publisher.send(RoomEvent::Rejected {
                client_id,
                name: name.clone(),
            });
            return Err(RoomError::NameTaken(name));
        }

        self.members.insert(
            client_id,
            Member {
                name: name.clone(),
                writer,
            },
        );

        debug!(
            client_id = %client_id,
            name = %name,
            total_members = self.members.len(),
            "Client joined"
        );

        // Publish event (ignore if no subscribers)
        let _ = self
            .event_publisher
            .send(RoomEvent::Joined { client_id, name });

        Ok(())
    }

    /// Removes a client from the roster. No-op for unknown ids.
    fn handle_leave(&mut self, client_id: ClientId) -> Option<DisplayName> {
        let member = self.members.remove(&client_id)?;

        debug!(
            client_id = %client_id,
            name = %member.name,
            total_members = self.members.len(),
            "Client left"
        );

        let _ = self.event_publisher.send(RoomEvent::Left {
            client_id,
            name: member.name.clone(),
        });

        Some(member.name)
    }

    /// Appends a line to history, then writes it to every member.
    ///
    /// A failed write is logged and skipped; the member stays registered
    /// until its own connection handler notices the broken stream.
    async fn publish(&mut self, line: ChatLine, except: Option<ClientId>) -> Delivery {
        self.history.push(line.clone());

        let msg = ServerMessage::line(line.clone());
        let mut delivered = 0;
        let mut failed = 0;

        for (client_id, member) in &self.members {
            if except == Some(*client_id) {
                continue;
            }

            match send_message(&member.writer, &msg).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        client_id = %client_id,
                        name = %member.name,
                        error = %e,
                        "Failed to deliver line"
                    );
                    failed += 1;
                }
            }
        }

        let _ = self.event_publisher.send(RoomEvent::Published {
            line: line.clone(),
            delivered,
            failed,
        });

        Delivery {
            line,
            delivered,
            failed,
        }
    }

    /// Case-insensitive scan of the registered names.
    fn is_name_taken(&self, candidate: &DisplayName) -> bool {
        self.members
            .values()
            .any(|member| member.name.matches(candidate))
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of registered members.
    #[cfg(test)]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
