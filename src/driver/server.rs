//! Frame loops over stdio and TCP.

use crate::core::config::Config;
use crate::core::error::{LexportError, Result};
use crate::driver::error::DriverError;
use crate::driver::session::{self, Session};
use crate::driver::transport::{Frame, FrameReader, FrameWriter};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// What to do after replying to an oversized frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OversizePolicy {
    KeepOpen,
    Close,
}

/// Serve requests from `reader` until end of stream
pub async fn serve_stream<R, W>(
    session: &mut Session,
    reader: R,
    writer: W,
    max_frame_bytes: usize,
    oversize: OversizePolicy,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FrameReader::new(reader, max_frame_bytes);
    let mut out = FrameWriter::new(writer);

    while let Some(frame) = frames.read_frame().await? {
        match frame {
            Frame::Request(request) => {
                let reply = session.handle(&request);
                out.write_frame(&reply).await?;
            }
            Frame::Oversized(len) => {
                let err = DriverError::BadArgument(format!(
                    "Frame of {len} bytes exceeds the {max_frame_bytes} byte limit"
                ));
                out.write_frame(&session::error_reply(&err)).await?;
                if oversize == OversizePolicy::Close {
                    break;
                }
            }
        }
    }
    Ok(())
}

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn new_session(&self) -> Result<Session> {
        Session::new(&self.config).map_err(|e| LexportError::ServerError(e.to_string()))
    }

    /// Serve a single session over stdin/stdout (blocking)
    pub async fn run_stdio(&self) -> Result<()> {
        info!("Starting lexport server on stdio");
        let mut session = self.new_session()?;

        // Spawn signal handler
        let mut shutdown = tokio::spawn(async {
            tokio::signal::ctrl_c().await.ok();
        });

        let serve = serve_stream(
            &mut session,
            tokio::io::stdin(),
            tokio::io::stdout(),
            self.config.server.max_frame_bytes,
            OversizePolicy::KeepOpen,
        );

        tokio::select! {
            result = serve => {
                if let Err(e) = &result {
                    error!("Stdio session failed: {}", e);
                }
                result?;
                info!("Input closed");
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal");
            }
        }

        info!(requests = session.request_count(), "lexport server shutting down");
        Ok(())
    }

    /// Accept TCP connections, one session each, until Ctrl-C
    pub async fn run_tcp(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.listen).await?;
        info!("Listening on {}", self.config.server.listen);

        let mut shutdown = tokio::spawn(async {
            tokio::signal::ctrl_c().await.ok();
        });

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    let mut session = match self.new_session() {
                        Ok(session) => session,
                        Err(e) => {
                            error!(%peer, "Failed to start session: {}", e);
                            continue;
                        }
                    };
                    let max_frame_bytes = self.config.server.max_frame_bytes;
                    tokio::spawn(async move {
                        info!(%peer, "Connection opened");
                        let (reader, writer) = socket.into_split();
                        if let Err(e) = serve_stream(
                            &mut session,
                            reader,
                            writer,
                            max_frame_bytes,
                            OversizePolicy::Close,
                        )
                        .await
                        {
                            error!(%peer, "Connection failed: {}", e);
                        }
                        debug!(%peer, requests = session.request_count(), "Connection closed");
                    });
                }

                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("lexport server shutting down");
        Ok(())
    }
}
