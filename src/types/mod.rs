//! Core data types shared by the camera link and the analysis pipeline.
//!
//! - [`Frame`] is the fundamental unit flowing out of the camera link: one
//!   complete encoded image, validated at construction, shared zero-copy.
//! - [`AnalysisResult`] is the strict decode target for the vision model's
//!   answer.

mod frame;
mod result;

pub use frame::Frame;
pub use result::AnalysisResult;
