//! Length-prefixed frame transport.
//!
//! Every request and reply is a `u32` little-endian length followed by
//! that many bytes. Works over any tokio byte stream: stdio for the
//! embedded server, TCP sockets for `serve --tcp`.

use crate::core::error::Result;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};

/// One incoming frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Request(Vec<u8>),
    /// A frame above the size limit; its payload was skipped
    Oversized(usize),
}

pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
        }
    }

    /// Next frame, or `None` on a clean end of stream
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut header = [0u8; 4];
        match self.reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > self.max_frame_bytes {
            warn!(len, max = self.max_frame_bytes, "Skipping oversized frame");
            let skipped = tokio::io::copy(
                &mut (&mut self.reader).take(len as u64),
                &mut tokio::io::sink(),
            )
            .await?;
            if (skipped as usize) < len {
                return Ok(None);
            }
            return Ok(Some(Frame::Oversized(len)));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await?;
        debug!(len, "Received frame");
        Ok(Some(Frame::Request(payload)))
    }
}

pub struct FrameWriter<W: AsyncWrite> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write one frame and flush it
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            crate::core::error::LexportError::ServerError(format!(
                "Reply of {} bytes does not fit in a frame",
                payload.len()
            ))
        })?;
        self.writer.write_all(&len.to_le_bytes()).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        debug!(len, "Sent frame");
        Ok(())
    }
}
