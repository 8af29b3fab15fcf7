//! Seams to the dispatcher's external collaborators.
//!
//! Billing, moderation, rating persistence, and message rendering are
//! consumed through narrow object-safe traits so the dispatch flow can
//! be exercised against stubs.

use async_trait::async_trait;
use tokio::sync::mpsc;

use palette_core::controls::ControlLayout;
use palette_core::types::{JobId, UserId};
use palette_imagine::{
    FinishedJob, GenerationRequest, ImagineError, JobOrchestrator, JobProgress,
};

/// Errors from collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Billing error: {0}")]
    Billing(String),

    #[error("Moderation error: {0}")]
    Moderation(String),

    #[error("Rating store error: {0}")]
    RatingStore(String),

    #[error("Message surface error: {0}")]
    Surface(String),
}

/// Charges user accounts for produced images.
///
/// Implementations are expected to charge idempotently per job id.
#[async_trait]
pub trait BillingService: Send + Sync {
    async fn charge_for_image(
        &self,
        user_id: &UserId,
        job: &FinishedJob,
    ) -> Result<(), DispatchError>;
}

/// Verdict of the moderation gate for a prompt.
#[derive(Debug, Clone, Copy)]
pub struct ModerationVerdict {
    pub blocked: bool,
}

/// Pre-submission prompt screening. Consulted before initial
/// generations only; a blocked prompt short-circuits before any job is
/// created.
#[async_trait]
pub trait ModerationGate: Send + Sync {
    async fn check_prompt(
        &self,
        user_id: &UserId,
        prompt: &str,
        model: &str,
    ) -> Result<ModerationVerdict, DispatchError>;
}

/// Persisted rating records, keyed by job id.
///
/// The dispatcher reads the whole payload, merges the `rating` field,
/// and writes the whole payload back (last-writer-wins).
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn fetch(&self, job_id: &JobId) -> Result<Option<serde_json::Value>, DispatchError>;

    async fn persist(
        &self,
        job_id: &JobId,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError>;
}

/// The message an interaction happened on.
///
/// Rendering of embeds and attachments lives behind this seam; the
/// dispatcher only pushes whole-layout control replacements and status
/// text through it.
#[async_trait]
pub trait MessageSurface: Send + Sync {
    /// Replace the message's interactive controls with a new layout.
    async fn replace_controls(&self, layout: &ControlLayout) -> Result<(), DispatchError>;

    /// Render one in-flight progress notification.
    async fn show_progress(&self, progress: &JobProgress) -> Result<(), DispatchError>;

    /// Render a terminal result together with its follow-up controls.
    async fn present_result(
        &self,
        job: &FinishedJob,
        controls: &ControlLayout,
    ) -> Result<(), DispatchError>;

    /// Render a short user-facing failure message.
    async fn show_failure(&self, message: &str) -> Result<(), DispatchError>;

    /// Acknowledge the interaction without changing anything visible.
    async fn acknowledge(&self) -> Result<(), DispatchError>;
}

/// Runs a generation request to its terminal state, streaming progress
/// to the given sink. Implemented by [`JobOrchestrator`]; stubbed in
/// tests.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn submit(
        &self,
        request: GenerationRequest,
        progress: mpsc::Sender<JobProgress>,
    ) -> Result<FinishedJob, ImagineError>;
}

#[async_trait]
impl JobRunner for JobOrchestrator {
    async fn submit(
        &self,
        request: GenerationRequest,
        progress: mpsc::Sender<JobProgress>,
    ) -> Result<FinishedJob, ImagineError> {
        JobOrchestrator::submit(self, request, progress).await
    }
}
