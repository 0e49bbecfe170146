//! Camera link and remote vision-analysis core for a field-scouting rover.
//!
//! Mycoscope is the engine behind a head-mounted control panel that watches a
//! remote rover's camera and asks a cloud vision model what the camera sees.
//! The rendering, input handling, and UI feedback around it are the embedding
//! application's business; this crate provides the two subsystems that need
//! care:
//!
//! - **Camera link**: a persistent TCP connection receiving length-prefixed
//!   JPEG frames on a background task, exposing only the freshest frame,
//!   never an unbounded queue.
//! - **Analysis pipeline**: a single-flight state machine that snapshots the
//!   displayed frame and drives the remote service through upload, job start,
//!   status polling, and result extraction, with per-stage deadlines and
//!   cancellation.
//!
//! A small fire-and-forget [`command`] channel for rover drive and gimbal
//! commands rounds out the device side.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mycoscope::{
//!     AnalysisClient, AnalysisConfig, AnalysisPipeline, CameraConfig, CameraLink, PipelineState,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mycoscope::Result<()> {
//!     let camera = CameraLink::connect(CameraConfig::default()).await?;
//!
//!     let config = AnalysisConfig {
//!         api_token: std::env::var("API_TOKEN").unwrap_or_default(),
//!         ..Default::default()
//!     };
//!     let client = Arc::new(AnalysisClient::new(config.clone())?);
//!     let pipeline = AnalysisPipeline::new(client, config);
//!
//!     // On user action: analyze whatever is currently displayed.
//!     pipeline.trigger(camera.take_latest_frame());
//!
//!     let mut states = pipeline.state_updates();
//!     # let _ = &mut states;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod command;
mod config;
mod error;
pub mod link;
pub mod types;

pub use analysis::{
    AnalysisApi, AnalysisClient, AnalysisPipeline, FailureKind, JobHandle, PipelineState,
};
pub use command::{CommandLink, DriveCommand, GimbalAngles};
pub use config::{AnalysisConfig, CameraConfig, DEFAULT_MAX_FRAME_LEN, DEFAULT_PROMPT};
pub use error::{Result, VisionError};
pub use link::{CameraLink, ConnectionState};
pub use types::{AnalysisResult, Frame};
