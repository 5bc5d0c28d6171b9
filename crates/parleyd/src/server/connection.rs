//! Connection handler for individual chat clients.
//!
//! Each accepted connection gets its own `ConnectionHandler` that walks the
//! session through its states:
//!
//! ```text
//! AwaitingName ──▶ Registered ──▶ Reading ──▶ Closed
//!      │               │                        ▲
//!      │ EOF / error   │ name taken             │
//!      └───────────────┴────────────────────────┘
//! ```
//!
//! - **AwaitingName**: send the prompt, read one line, trim it into a name
//! - **Registered**: replay history, then join the room; on success send the
//!   welcome and announce the arrival to everybody else
//! - **Reading**: forward every non-blank line to the room
//! - **Closed**: leave the room, close the stream, announce the departure
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in a disconnect

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use parley_core::{ClientId, DisplayName, Presence};
use parley_protocol::{ClientLine, LineReader, ProtocolError, ServerMessage};

use crate::room::{send_message, session_writer, RoomError, RoomHandle, SessionWriter};

/// Per-connection behavior switches taken from the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionOptions {
    /// Announce a departure for clients whose name was rejected.
    pub announce_rejected_departures: bool,
}

/// Result of the registration step.
enum Registration {
    /// The client is in the room.
    Joined,
    /// The name was taken; the client never became visible.
    Rejected,
}

/// Connection handler for a single client.
pub struct ConnectionHandler<R> {
    /// Line reader over the read half
    reader: LineReader<R>,

    /// Writer shared with the room for fan-out
    writer: SessionWriter,

    /// Handle to the room actor
    room: RoomHandle,

    /// Identity of this connection
    client_id: ClientId,

    /// Remote address, when known
    peer: Option<SocketAddr>,

    options: ConnectionOptions,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `reader` - Read half of the client stream
    /// * `writer` - Write half of the client stream
    /// * `room` - Handle to the room actor
    /// * `client_id` - Unique identity for this connection
    pub fn new<W>(reader: R, writer: W, room: RoomHandle, client_id: ClientId) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: LineReader::new(reader),
            writer: session_writer(writer),
            room,
            client_id,
            peer: None,
            options: ConnectionOptions::default(),
        }
    }

    /// Records the remote address for logging.
    #[must_use]
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Applies configuration switches.
    #[must_use]
    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the connection handler until the client goes away.
    ///
    /// Returns the name the client was registered under, or `None` if it
    /// never completed registration.
    pub async fn run(mut self) -> Option<DisplayName> {
        debug!(client_id = %self.client_id, peer = ?self.peer, "New client connected");

        // AwaitingName
        let name = match self.await_name().await {
            Ok(Some(name)) => name,
            Ok(None) => {
                debug!(client_id = %self.client_id, "Client left before sending a name");
                self.close().await;
                return None;
            }
            Err(e) => {
                warn!(client_id = %self.client_id, error = %e, "Name handshake failed");
                self.close().await;
                return None;
            }
        };

        // Registered
        match self.register(&name).await {
            Ok(Registration::Joined) => {
                info!(
                    client_id = %self.client_id,
                    name = %name,
                    peer = ?self.peer,
                    "Client registered"
                );
            }
            Ok(Registration::Rejected) => {
                info!(client_id = %self.client_id, name = %name, "Name already taken");
                self.close().await;
                if self.options.announce_rejected_departures {
                    self.announce_departure(&name).await;
                }
                return None;
            }
            Err(e) => {
                warn!(client_id = %self.client_id, error = %e, "Registration failed");
                self.close().await;
                return None;
            }
        }

        // Reading
        if let Err(e) = self.process_messages(&name).await {
            debug!(client_id = %self.client_id, error = %e, "Connection closed");
        }

        // Closed
        self.room.leave(self.client_id).await;
        self.close().await;
        self.announce_departure(&name).await;

        info!(client_id = %self.client_id, name = %name, "Client disconnected");
        Some(name)
    }

    /// Prompts for a name and reads it.
    ///
    /// Returns `Ok(None)` if the peer closed the stream first.
    async fn await_name(&mut self) -> Result<Option<DisplayName>, ConnectionError> {
        self.send(&ServerMessage::NamePrompt).await?;

        let line = self.reader.next_line().await?;
        Ok(line.map(|raw| DisplayName::from_input(&raw)))
    }

    /// Replays history, then joins the room.
    async fn register(&mut self, name: &DisplayName) -> Result<Registration, ConnectionError> {
        // Replay before joining, so the joiner's own announcement is never
        // part of what it is replayed.
        match self.room.replay_history(self.writer.clone()).await {
            Ok(replayed) => debug!(client_id = %self.client_id, replayed, "History replayed"),
            Err(RoomError::Write(e)) => {
                debug!(client_id = %self.client_id, error = %e, "History replay incomplete");
            }
            Err(e) => return Err(e.into()),
        }

        match self
            .room
            .join(self.client_id, name.clone(), self.writer.clone())
            .await
        {
            Ok(()) => {}
            Err(RoomError::NameTaken(_)) => {
                if let Err(e) = self.send(&ServerMessage::NameTaken).await {
                    debug!(client_id = %self.client_id, error = %e, "Failed to send rejection");
                }
                return Ok(Registration::Rejected);
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.send(&ServerMessage::welcome(name.clone())).await {
            debug!(client_id = %self.client_id, error = %e, "Failed to send welcome");
        }

        if let Err(e) = self
            .room
            .announce(name.clone(), Presence::Joined, Some(self.client_id))
            .await
        {
            warn!(client_id = %self.client_id, error = %e, "Failed to announce arrival");
        }

        Ok(Registration::Joined)
    }

    /// Main read loop.
    ///
    /// Returns `Ok(())` on EOF and an error on read failure; both end the
    /// session the same way.
    async fn process_messages(&mut self, name: &DisplayName) -> Result<(), ConnectionError> {
        loop {
            let line = match self.reader.next_line().await? {
                Some(line) => line,
                None => {
                    debug!(client_id = %self.client_id, "Client sent EOF");
                    return Ok(());
                }
            };

            match ClientLine::parse(&line) {
                ClientLine::Blank => continue,
                ClientLine::Chat(text) => {
                    self.room.broadcast(name.clone(), text).await?;
                }
            }
        }
    }

    /// Tells the room this client is gone.
    async fn announce_departure(&self, name: &DisplayName) {
        if let Err(e) = self.room.announce(name.clone(), Presence::Left, None).await {
            warn!(client_id = %self.client_id, error = %e, "Failed to announce departure");
        }
    }

    /// Sends a message to this client.
    async fn send(&self, msg: &ServerMessage) -> Result<(), ConnectionError> {
        send_message(&self.writer, msg).await?;
        Ok(())
    }

    /// Shuts down the write half. Errors are irrelevant at this point.
    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Room error: {0}")]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::spawn_room;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;

    /// Client end of an in-memory connection driven by a spawned handler.
    struct TestPeer {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
        task: JoinHandle<Option<DisplayName>>,
    }

    impl TestPeer {
        fn spawn(room: &RoomHandle, id: u64, options: ConnectionOptions) -> Self {
            let (client, server) = tokio::io::duplex(4096);
            let (server_read, server_write) = tokio::io::split(server);
            let handler =
                ConnectionHandler::new(server_read, server_write, room.clone(), ClientId::new(id))
                    .with_options(options);
            let task = tokio::spawn(handler.run());

            let (client_read, client_write) = tokio::io::split(client);
            Self {
                reader: BufReader::new(client_read),
                writer: client_write,
                task,
            }
        }

        async fn read_prompt(&mut self) {
            let mut prompt = vec![0u8; parley_protocol::NAME_PROMPT.len()];
            self.reader.read_exact(&mut prompt).await.unwrap();
            assert_eq!(prompt, parley_protocol::NAME_PROMPT.as_bytes());
        }

        async fn send(&mut self, text: &str) {
            self.writer.write_all(text.as_bytes()).await.unwrap();
            self.writer.flush().await.unwrap();
        }

        async fn read_line(&mut self) -> String {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            line
        }

        /// Prompt, name, replay (discarded), welcome.
        async fn login(&mut self, name: &str) {
            self.read_prompt().await;
            self.send(&format!("{name}\n")).await;
            loop {
                let line = self.read_line().await;
                if line.starts_with("Welcome to the chat") {
                    break;
                }
                assert!(!line.is_empty(), "connection closed during login");
            }
        }
    }

    /// Waits until the room has published `len` lines.
    async fn wait_for_history(room: &RoomHandle, len: usize) {
        while room.history().await.len() < len {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_registers_and_welcomes() {
        let room = spawn_room();
        let mut peer = TestPeer::spawn(&room, 1, ConnectionOptions::default());

        peer.read_prompt().await;
        peer.send("  Bob \n").await;
        assert_eq!(peer.read_line().await, "Welcome to the chat, Bob!\n");

        let members = room.members().await;
        assert_eq!(members, vec![(ClientId::new(1), DisplayName::new("Bob"))]);
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let room = spawn_room();
        let mut peer = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        peer.login("Bob").await;

        peer.send("\n   \nhello\n").await;
        let line = peer.read_line().await;
        assert!(line.ends_with("][Bob]: hello\n"), "got {line:?}");

        // Only the join announcement and the one message
        let history = room.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].as_str(), "Bob: has joined our chat...");
    }

    #[tokio::test]
    async fn test_eof_before_name_registers_nothing() {
        let room = spawn_room();
        let mut peer = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        peer.read_prompt().await;
        peer.writer.shutdown().await.unwrap();

        assert_eq!(peer.task.await.unwrap(), None);
        assert!(room.history().await.is_empty());
        assert_eq!(room.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_name_closes_without_broadcast() {
        let room = spawn_room();
        let mut bob = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        bob.login("Bob").await;
        wait_for_history(&room, 1).await;

        let mut imposter = TestPeer::spawn(&room, 2, ConnectionOptions::default());
        imposter.read_prompt().await;
        imposter.send("bob\n").await;

        assert_eq!(imposter.read_line().await, "Bob: has joined our chat...\n");
        assert_eq!(
            imposter.read_line().await,
            "Username is already taken. Please try again.\n"
        );
        assert_eq!(imposter.read_line().await, "", "connection should be closed");
        assert_eq!(imposter.task.await.unwrap(), None);

        let history = room.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_blank_name_registers_once() {
        let room = spawn_room();
        let mut first = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        first.read_prompt().await;
        first.send("   \r\n").await;
        assert_eq!(first.read_line().await, "Welcome to the chat, !\n");
        wait_for_history(&room, 1).await;

        let mut second = TestPeer::spawn(&room, 2, ConnectionOptions::default());
        second.read_prompt().await;
        second.send("\n").await;

        assert_eq!(second.read_line().await, ": has joined our chat...\n");
        assert_eq!(
            second.read_line().await,
            "Username is already taken. Please try again.\n"
        );
        assert_eq!(second.task.await.unwrap(), None);

        let members = room.members().await;
        assert_eq!(members, vec![(ClientId::new(1), DisplayName::new(""))]);
    }

    #[tokio::test]
    async fn test_rejected_departure_announced_when_enabled() {
        let room = spawn_room();
        let mut bob = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        bob.login("Bob").await;

        let options = ConnectionOptions {
            announce_rejected_departures: true,
        };
        let mut imposter = TestPeer::spawn(&room, 2, options);
        imposter.read_prompt().await;
        imposter.send("BOB\n").await;
        assert_eq!(imposter.task.await.unwrap(), None);

        assert_eq!(bob.read_line().await, "BOB: has left our chat...\n");
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_and_announces() {
        let room = spawn_room();
        let mut alice = TestPeer::spawn(&room, 1, ConnectionOptions::default());
        alice.login("Alice").await;
        let mut bob = TestPeer::spawn(&room, 2, ConnectionOptions::default());
        bob.login("Bob").await;
        assert_eq!(alice.read_line().await, "Bob: has joined our chat...\n");

        bob.writer.shutdown().await.unwrap();
        assert_eq!(bob.task.await.unwrap(), Some(DisplayName::new("Bob")));

        assert_eq!(alice.read_line().await, "Bob: has left our chat...\n");
        assert!(!room.is_name_taken(DisplayName::new("Bob")).await);
    }
}
