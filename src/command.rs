//! Fire-and-forget command channel to the rover.
//!
//! The rover accepts newline-terminated JSON commands over a persistent TCP
//! connection: `{"act":N}` for drive actions and `{"servo1":P,"servo2":Y}` for
//! the camera gimbal. There is no acknowledgement and no retry; a write either
//! succeeds or surfaces a connection error and the owner reconnects.

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Result, VisionError};

/// Drive actions understood by the rover firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Forward,
    Backward,
    TurnRight,
    TurnLeft,
    Stop,
}

impl DriveCommand {
    /// Firmware action code.
    fn act(self) -> u8 {
        match self {
            DriveCommand::Forward => 0,
            DriveCommand::Backward => 1,
            DriveCommand::TurnRight => 2,
            DriveCommand::TurnLeft => 3,
            DriveCommand::Stop => 6,
        }
    }
}

/// Target angles for the pan-tilt gimbal, in servo degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GimbalAngles {
    /// Vertical servo (servo1).
    pub pitch: u8,
    /// Horizontal servo (servo2).
    pub yaw: u8,
}

#[derive(Serialize)]
struct DrivePacket {
    act: u8,
}

#[derive(Serialize)]
struct GimbalPacket {
    servo1: u8,
    servo2: u8,
}

/// Persistent command connection to the rover.
pub struct CommandLink {
    stream: TcpStream,
}

impl CommandLink {
    /// Connect to the rover's command port.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            VisionError::connection_failed_with_source(
                format!("connect to rover at {addr} failed"),
                Box::new(e),
            )
        })?;
        info!(%addr, "command link established");
        Ok(Self { stream })
    }

    /// Send a drive action.
    pub async fn drive(&mut self, command: DriveCommand) -> Result<()> {
        debug!(?command, "sending drive command");
        self.send_line(&DrivePacket { act: command.act() }).await
    }

    /// Point the gimbal.
    pub async fn gimbal(&mut self, angles: GimbalAngles) -> Result<()> {
        debug!(pitch = angles.pitch, yaw = angles.yaw, "sending gimbal command");
        self.send_line(&GimbalPacket { servo1: angles.pitch, servo2: angles.yaw }).await
    }

    async fn send_line<T: Serialize>(&mut self, packet: &T) -> Result<()> {
        let mut line = serde_json::to_vec(packet)
            .map_err(|e| VisionError::decode("command encoding", e.to_string()))?;
        line.push(b'\n');
        self.stream.write_all(&line).await?;
        Ok(())
    }
}
