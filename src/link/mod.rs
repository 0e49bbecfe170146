//! Streaming TCP camera link.
//!
//! The camera device pushes JPEG frames over one persistent TCP connection
//! using a minimal length-prefixed framing:
//!
//! ```text
//! repeat:
//!   uint32 frame_length (big-endian)   -- 0 or > cap: skipped, keep listening
//!   byte[frame_length]                 -- raw encoded image bytes
//! ```
//!
//! [`CameraLink`] owns the socket and a background receive task; consumers see
//! only the freshest frame through [`CameraLink::take_latest_frame`]. There is
//! no resynchronization scan after a corrupt length prefix: the reader keeps
//! treating subsequent bytes as length-prefixed, matching the device firmware's
//! documented behavior.

mod receiver;
mod slot;

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CameraConfig;
use crate::error::{Result, VisionError};
use crate::types::Frame;
use receiver::Receiver;
use slot::FrameSlot;

/// Connection lifecycle of the camera link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the initial and post-close state.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Receive loop running.
    Connected,
    /// The receive loop ended on a read error or timeout. The link does not
    /// reconnect on its own; the owner decides the reconnect policy.
    Faulted,
}

/// Persistent connection to the camera device.
///
/// The receive loop runs on its own task and never blocks the caller; the only
/// shared state is the single-slot latest-frame cell. Dropping the link (or
/// calling [`close`](Self::close)) cancels the task, which closes the socket
/// promptly rather than waiting out a read timeout.
pub struct CameraLink {
    slot: Arc<FrameSlot>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl CameraLink {
    /// Connect to the camera and start the receive loop.
    ///
    /// Sets `TCP_NODELAY` so frame boundaries arrive promptly and applies the
    /// configured receive timeout to every read. A failed connect surfaces a
    /// [`VisionError::Connection`]; there is no automatic retry.
    pub async fn connect(config: CameraConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        info!(%addr, "connecting to camera");

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                let _ = state_tx.send(ConnectionState::Faulted);
                VisionError::connection_failed(format!(
                    "connect to {addr} timed out after {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| {
                let _ = state_tx.send(ConnectionState::Faulted);
                VisionError::connection_failed_with_source(
                    format!("connect to {addr} failed"),
                    Box::new(e),
                )
            })?;
        stream.set_nodelay(true)?;

        let slot = Arc::new(FrameSlot::default());
        let cancel = CancellationToken::new();

        let _ = state_tx.send(ConnectionState::Connected);
        let receiver = Receiver::new(
            stream,
            Arc::clone(&slot),
            state_tx,
            cancel.clone(),
            config.recv_timeout,
            config.max_frame_len,
        );
        tokio::spawn(receiver.run());

        info!(%addr, "camera link established");
        Ok(Self { slot, state: state_rx, cancel })
    }

    /// Atomically remove and return the freshest buffered frame, if any.
    ///
    /// Safe to call from any task; the receive loop is never blocked by a
    /// consumer that ignores frames.
    pub fn take_latest_frame(&self) -> Option<Frame> {
        self.slot.take()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Connection state changes as a stream, freshest value first.
    pub fn state_updates(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.state.clone())
    }

    /// Stop the receive loop and close the socket. Idempotent; also runs on
    /// drop.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for CameraLink {
    fn drop(&mut self) {
        debug!("dropping camera link");
        self.cancel.cancel();
    }
}
