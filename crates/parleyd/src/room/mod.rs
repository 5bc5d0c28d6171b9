//! Chat room using the Actor pattern.
//!
//! The room is the single owner of the member roster and the chat history.
//! Connection handlers talk to it through a `RoomHandle`; every join, leave,
//! replay and fan-out is processed one command at a time, so the roster and
//! the history can never be observed half-updated.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ ConnectionHandler │────▶│    RoomActor    │────▶│ Broadcast Channel│
//! └───────────────────┘     └─────────────────┘     └──────────────────┘
//!          │                        │                        │
//!          │   RoomCommand          │   writes lines         │  RoomEvent
//!          │   (mpsc channel)       ▼                        ▼
//!          │               every member's socket       console mirror
//!          ▼
//!   join / leave / broadcast
//! ```
//!
//! # Ordering
//!
//! History replay for a new client runs before that client joins. A line
//! published between the end of the replay and the join is therefore not
//! seen by the joiner. This gap is accepted; closing it would require
//! buffering per joiner.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::{broadcast, mpsc};

mod actor;
mod commands;
mod handle;
mod member;

pub use actor::RoomActor;
pub use commands::{Delivery, RoomCommand, RoomError, RoomEvent};
pub use handle::RoomHandle;
pub use member::{send_message, session_writer, SessionWriter};

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 256;

/// Spawn the room actor and return a handle for interaction.
///
/// # Example
///
/// ```no_run
/// use parleyd::room::spawn_room;
///
/// #[tokio::main]
/// async fn main() {
///     let room = spawn_room();
///     let members = room.members().await;
///     assert!(members.is_empty());
/// }
/// ```
pub fn spawn_room() -> RoomHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = RoomActor::new(cmd_rx, event_tx.clone());
    tokio::spawn(actor.run());

    RoomHandle::new(cmd_tx, event_tx)
}
