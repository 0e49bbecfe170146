//! Remote vision-analysis subsystem.
//!
//! [`AnalysisClient`] implements the four stateless HTTP operations against the
//! analysis service; [`AnalysisPipeline`] sequences them as a single-flight
//! state machine with per-stage deadlines; [`extract`] slices the structured
//! result out of the model's free-text answer.

mod api;
mod client;
pub mod extract;
mod pipeline;

pub use api::{AnalysisApi, JobHandle};
pub use client::AnalysisClient;
pub use pipeline::{AnalysisPipeline, FailureKind, PipelineState};
