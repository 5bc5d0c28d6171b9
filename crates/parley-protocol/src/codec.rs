//! Newline framing over async byte streams.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::ServerMessage;

/// Errors raised while reading or writing protocol text.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads newline-terminated lines from a client stream.
///
/// A trailing fragment that is not followed by a newline before the peer
/// closes the stream is discarded: the relay only acts on complete lines.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wraps a readable stream.
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Reads the next complete line, including its terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. Invalid UTF-8
    /// is replaced rather than rejected.
    pub async fn next_line(&mut self) -> Result<Option<String>, ProtocolError> {
        self.buf.clear();

        let bytes_read = self.inner.read_until(b'\n', &mut self.buf).await?;
        if bytes_read == 0 || self.buf.last() != Some(&b'\n') {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Writes one server message and flushes it.
pub async fn write_message<W>(writer: &mut W, msg: &ServerMessage) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(msg.to_string().as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
