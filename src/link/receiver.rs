//! Background receive loop for the camera link.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::ConnectionState;
use super::slot::FrameSlot;
use crate::error::{Result, VisionError};
use crate::types::Frame;

/// Owns the socket and runs the length-prefixed receive loop until cancelled,
/// the stream closes, or a read fails.
pub(crate) struct Receiver {
    stream: TcpStream,
    slot: Arc<FrameSlot>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    recv_timeout: Duration,
    max_frame_len: usize,
}

impl Receiver {
    pub(crate) fn new(
        stream: TcpStream,
        slot: Arc<FrameSlot>,
        state: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
        recv_timeout: Duration,
        max_frame_len: usize,
    ) -> Self {
        Self { stream, slot, state, cancel, recv_timeout, max_frame_len }
    }

    /// Run until stopped. Invalid lengths are skipped without resync scanning:
    /// the next 4 bytes on the wire are read as the next length prefix.
    pub(crate) async fn run(mut self) {
        info!("frame receiver started");
        let mut delivered = 0u64;
        let mut skipped = 0u64;
        let cancel = self.cancel.clone();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(delivered, skipped, "frame receiver stopped");
                    let _ = self.state.send(ConnectionState::Disconnected);
                    return;
                }
                next = self.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => {
                    delivered += 1;
                    trace!(len = frame.len(), delivered, "frame received");
                    if self.slot.put(frame) {
                        trace!("replaced unconsumed frame in slot");
                    }
                }
                Ok(None) => {
                    // Invalid length prefix: absorbed, keep listening.
                    skipped += 1;
                }
                Err(VisionError::Protocol { details }) => {
                    warn!(%details, "discarding invalid frame");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(error = %e, delivered, "frame receiver faulted");
                    let _ = self.state.send(ConnectionState::Faulted);
                    return;
                }
            }
        }
    }

    /// Read one protocol unit: a 4-byte big-endian length, then that many
    /// payload bytes. Returns `Ok(None)` for a length of zero or above the
    /// configured cap.
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut len_buf = [0u8; 4];
        self.read_exact(&mut len_buf).await?;

        let declared = u32::from_be_bytes(len_buf) as usize;
        if declared == 0 || declared > self.max_frame_len {
            debug!(declared, cap = self.max_frame_len, "skipping frame with invalid length");
            return Ok(None);
        }

        let mut payload = vec![0u8; declared];
        self.read_exact(&mut payload).await?;

        Frame::new(payload, self.max_frame_len).map(Some)
    }

    /// Fill the buffer completely or fail. Short reads are retried by
    /// `read_exact`; EOF and the receive timeout both terminate the loop.
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match tokio::time::timeout(self.recv_timeout, self.stream.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(VisionError::connection_failed_with_source(
                "camera stream read failed",
                Box::new(e),
            )),
            Err(_) => Err(VisionError::Timeout { duration: self.recv_timeout }),
        }
    }
}
