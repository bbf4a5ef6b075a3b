use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AudioSocketResult, wrap_pcm16};

/// 20 ms of 8 kHz PCM16.
pub const FRAME_BYTES: usize = 320;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct PacedWriter {
    writer: BoxedWriter,
    ticker: Interval,
}

/// Outbound audio path towards the PBX.
///
/// The sink exists before the PBX connects so a vendor session can be initialized
/// early; writes wait until [`AudioSink::attach`] provides the connection. Audio is
/// written one frame per tick. [`AudioSink::discard`] aborts any write in progress
/// at the next frame boundary.
pub struct AudioSink {
    output: Mutex<Option<PacedWriter>>,
    attached: watch::Sender<bool>,
    epoch: AtomicU64,
    frame_interval: Duration,
    cancel: CancellationToken,
}

impl AudioSink {
    pub fn new(frame_interval: Duration, cancel: CancellationToken) -> Self {
        let (attached, _) = watch::channel(false);
        Self {
            output: Mutex::new(None),
            attached,
            epoch: AtomicU64::new(0),
            frame_interval,
            cancel,
        }
    }

    pub async fn attach(&self, writer: BoxedWriter) {
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *self.output.lock().await = Some(PacedWriter { writer, ticker });
        self.attached.send_replace(true);
    }

    pub fn is_attached(&self) -> bool {
        *self.attached.borrow()
    }

    /// Drops audio that is queued or currently being written.
    pub fn discard(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    async fn wait_attached(&self) -> bool {
        let mut rx = self.attached.subscribe();
        tokio::select! {
            res = rx.wait_for(|attached| *attached) => res.is_ok(),
            _ = self.cancel.cancelled() => false,
        }
    }

    /// Writes 8 kHz PCM16 as paced audio frames.
    ///
    /// Returns the number of frames written, which is short of the full buffer
    /// when the sink is cancelled or discarded mid-write.
    pub async fn write_paced(&self, pcm: &[u8]) -> AudioSocketResult<usize> {
        if pcm.is_empty() || !self.wait_attached().await {
            return Ok(0);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut output = self.output.lock().await;
        let Some(out) = output.as_mut() else {
            return Ok(0);
        };

        let mut written = 0;
        for chunk in pcm.chunks(FRAME_BYTES) {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = out.ticker.tick() => {}
            }

            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("Discarding remaining {} bytes of audio", pcm.len() - written * FRAME_BYTES);
                break;
            }

            let frame = wrap_pcm16(chunk)?;
            out.writer.write_all(&frame).await?;
            written += 1;
        }

        out.writer.flush().await?;
        Ok(written)
    }

    /// Closes the PBX side of the connection.
    pub async fn shutdown(&self) {
        if let Some(mut out) = self.output.lock().await.take()
            && let Err(e) = out.writer.shutdown().await
        {
            debug!("Error closing audio output: {}", e);
        }
    }
}
