//! Seam between the pipeline and the remote analysis service.

use async_trait::async_trait;

use crate::error::Result;

/// Identifiers of one in-flight analysis job on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Conversation the job belongs to.
    pub conversation_id: String,
    /// The job (chat) identifier itself.
    pub chat_id: String,
}

/// The four remote operations the pipeline sequences.
///
/// Each implementation attaches its own credential and per-request timeout and
/// surfaces transport, HTTP-status, and decode failures as typed errors, never
/// silently. The trait exists so the pipeline's state machine can be exercised
/// against scripted fakes.
#[async_trait]
pub trait AnalysisApi: Send + Sync + 'static {
    /// Upload a JPEG-encoded snapshot; returns the non-empty file identifier.
    async fn upload_image(&self, bytes: &[u8]) -> Result<String>;

    /// Submit one user turn referencing the uploaded file; returns the job
    /// identifiers. Fails if the service returns no job identifier.
    async fn start_job(&self, file_id: &str, prompt: &str) -> Result<JobHandle>;

    /// One status check. The retry loop lives in the pipeline.
    async fn poll_status(&self, job: &JobHandle) -> Result<String>;

    /// Retrieve the first message's raw text content for extraction.
    async fn fetch_result(&self, job: &JobHandle) -> Result<String>;
}
