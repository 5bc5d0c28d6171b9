//! Registered members and their outbound streams.

use std::sync::Arc;

use tokio::io::{AsyncWrite, BufWriter};
use tokio::sync::Mutex;

use parley_core::DisplayName;
use parley_protocol::{write_message, ProtocolError, ServerMessage};

/// Type-erased write half of a client connection.
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Shared writer for one client.
///
/// The connection handler and the room both write to the same client, so
/// the stream sits behind a mutex; each message is written and flushed
/// while the lock is held, which keeps lines from interleaving.
pub type SessionWriter = Arc<Mutex<BufWriter<BoxedWriter>>>;

/// Wraps a write half into a `SessionWriter`.
pub fn session_writer<W>(writer: W) -> SessionWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(BufWriter::new(Box::new(writer) as BoxedWriter)))
}

/// Writes one message to a client and flushes it.
pub async fn send_message(writer: &SessionWriter, msg: &ServerMessage) -> Result<(), ProtocolError> {
    let mut writer = writer.lock().await;
    write_message(&mut *writer, msg).await
}

/// A client that completed the name handshake.
pub(crate) struct Member {
    pub(crate) name: DisplayName,
    pub(crate) writer: SessionWriter,
}
