//! TCP server for the parley relay.
//!
//! The server:
//! - Listens on a TCP socket for chat clients
//! - Spawns a ConnectionHandler task for each client, without limit
//! - Mirrors room activity to the log
//! - Stops accepting when the CancellationToken fires
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│   RoomHandle    │
//! │   (per client)  │     │                 │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ RoomEvent
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │  event logger   │
//!                         └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the loop keeps going

mod connection;

pub use connection::{ConnectionError, ConnectionHandler, ConnectionOptions};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::ClientId;

use crate::config::Config;
use crate::room::{RoomEvent, RoomHandle};

/// TCP server for the chat relay.
pub struct ChatServer {
    /// Bound listener
    listener: TcpListener,

    /// Handle to the room actor
    room: RoomHandle,

    /// Cancellation token for stopping the accept loop
    cancel_token: CancellationToken,

    /// Connection counter for generating client IDs
    connection_counter: AtomicU64,

    /// Switches handed to every connection
    options: ConnectionOptions,
}

impl ChatServer {
    /// Binds the listen socket described by `config`.
    ///
    /// Binding happens here rather than in `run` so callers (and tests
    /// binding port 0) can learn the actual address before serving.
    pub async fn bind(
        config: &Config,
        room: RoomHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.bind,
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            room,
            cancel_token,
            connection_counter: AtomicU64::new(0),
            options: ConnectionOptions {
                announce_rejected_departures: config.announce_rejected_departures,
            },
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered.
    /// Sessions already running are not drained; they end with the process.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Chat server listening");

        self.spawn_event_logger();

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, peer, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        info!(
            connections = self.connection_counter.load(Ordering::Relaxed),
            "Chat server stopped"
        );
        Ok(())
    }

    /// Handles a new client connection by spawning a handler task.
    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, connection_number: u64) {
        let client_id = ClientId::new(connection_number);
        debug!(client_id = %client_id, peer = %peer, "Accepted connection");

        let (reader, writer) = stream.into_split();
        let handler = ConnectionHandler::new(reader, writer, self.room.clone(), client_id)
            .with_peer(peer)
            .with_options(self.options);

        tokio::spawn(handler.run());
    }

    /// Spawns the task that mirrors room events to the log.
    fn spawn_event_logger(&self) {
        let mut event_rx = self.room.subscribe();
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Event logger shutting down");
                        break;
                    }

                    result = event_rx.recv() => {
                        match result {
                            Ok(event) => log_event(&event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "Event logger lagged, skipped events");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Event channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

/// Writes one room event to the log.
fn log_event(event: &RoomEvent) {
    match event {
        RoomEvent::Joined { client_id, name } => {
            info!(client_id = %client_id, name = %name, "Member joined");
        }
        RoomEvent::Rejected { client_id, name } => {
            info!(client_id = %client_id, name = %name, "Member rejected");
        }
        RoomEvent::Left { client_id, name } => {
            info!(client_id = %client_id, name = %name, "Member left");
        }
        RoomEvent::Published {
            line,
            delivered,
            failed,
        } => {
            info!(delivered, failed, "{line}");
        }
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Failed to read listener address: {0}")]
    LocalAddr(String),
}
