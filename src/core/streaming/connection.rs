//! Per-connection lifecycle: identify, bind, stream, release.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::handler::StreamingHandler;
use super::session::StreamingSession;
use super::{StreamingError, StreamingResult};
use crate::core::audiosocket::{AudioSocketError, FrameKind, read_frame};

impl StreamingHandler {
    pub(super) async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let (mut reader, writer) = stream.into_split();

        let id = match self.identify(&mut reader).await {
            Ok(id) => id,
            Err(e) => {
                warn!(%peer, "Rejected media connection: {}", e);
                self.metrics.record_rejected_connection();
                return;
            }
        };

        let session = match self.resolve(id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%peer, streaming_id = %id, "Rejected media connection: {}", e);
                self.metrics.record_rejected_connection();
                return;
            }
        };
        if !session.bind_connection() {
            warn!(%peer, streaming_id = %id, "Session already bound or closed");
            self.metrics.record_rejected_connection();
            return;
        }
        info!(%peer, streaming_id = %id, "Media connection bound");

        session.sink.attach(Box::new(writer)).await;

        let mut tasks = JoinSet::new();
        tasks.spawn(drain_frames(reader, session.cancel.clone(), id));

        if let Err(e) = self.stream(&session).await {
            warn!(streaming_id = %id, "Streaming ended with error: {}", e);
        }

        session.cancel.cancel();
        tasks.shutdown().await;
        session.sink.shutdown().await;
        self.finalize(&session).await;
    }

    /// Reads the first frame, which must identify the session.
    async fn identify(&self, reader: &mut OwnedReadHalf) -> StreamingResult<Uuid> {
        let frame = timeout(self.config.identify_timeout, read_frame(reader))
            .await
            .map_err(|_| {
                AudioSocketError::Protocol("timed out waiting for identify frame".to_string())
            })??;
        Ok(frame.session_id()?)
    }

    async fn stream(&self, session: &Arc<StreamingSession>) -> StreamingResult<()> {
        let vendor = session
            .ensure_vendor(&self.registry, self.events.clone())
            .await?;
        session.mark_streaming();
        vendor.run().await.map_err(StreamingError::from)
    }
}

/// Consumes inbound frames until hangup, EOF or a read error, then cancels the session.
async fn drain_frames(mut reader: OwnedReadHalf, cancel: CancellationToken, id: Uuid) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = read_frame(&mut reader) => frame,
        };

        match frame {
            Ok(frame) => match frame.kind {
                FrameKind::Hangup => {
                    info!(streaming_id = %id, "PBX hung up");
                    break;
                }
                FrameKind::Error => {
                    warn!(streaming_id = %id, "PBX reported an error: {:?}", frame.payload);
                }
                // Outbound only; inbound audio is not used.
                FrameKind::Audio | FrameKind::Identify => {}
            },
            Err(AudioSocketError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!(streaming_id = %id, "Media connection closed");
                break;
            }
            Err(e) => {
                warn!(streaming_id = %id, "Media connection read failed: {}", e);
                break;
            }
        }
    }
    cancel.cancel();
}
