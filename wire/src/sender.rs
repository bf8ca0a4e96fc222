//! The sending half of the framed protocol.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LenType, Serialize};

/// Writes length-prefixed frames to the underlying writer.
///
/// The body buffer is reused across sends, so a long-lived connection
/// settles on one allocation sized to its largest control message.
pub struct WireSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    body: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> WireSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            body: Vec::new(),
        }
    }

    /// Frames and sends one message.
    ///
    /// The frame length covers the serialized body plus any zero-copy
    /// tail the message contributes; tail bytes go straight from the
    /// message to the writer without passing through the body buffer.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.body.clear();
        let tail = msg.serialize(&mut self.body);
        let tail_len = tail.map(<[_]>::len).unwrap_or_default();

        let len = (self.body.len() + tail_len) as LenType;
        self.tx.write_all(&len.to_be_bytes()).await?;
        self.tx.write_all(&self.body).await?;

        if let Some(data) = tail {
            self.tx.write_all(data).await?;
        }

        self.tx.flush().await
    }
}
