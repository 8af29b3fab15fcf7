//! Wire format of streamed generation updates.
//!
//! The service pushes JSON updates over WebSocket for every job
//! submitted with the connection's client id. One shape covers the
//! whole lifecycle: queue position, progress fraction, and the
//! terminal result or error.

use serde::Deserialize;

use palette_core::actions::JobAction;

/// One streamed update for a generation job.
///
/// Non-terminal updates carry `queued` and/or `status`; the terminal
/// update carries `done: true` with an image, or an `error` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUpdate {
    /// Job id this update belongs to.
    pub id: String,

    /// Whether the job reached its terminal success state.
    #[serde(default)]
    pub done: bool,

    /// Zero-based queue position while the job is waiting.
    #[serde(default)]
    pub queued: Option<u32>,

    /// Completion fraction in `0..1` while the job is running.
    #[serde(default)]
    pub status: Option<f64>,

    /// URL of the produced image, terminal updates only.
    #[serde(default)]
    pub image: Option<String>,

    /// The prompt the job was generated from, as echoed by the service.
    #[serde(default)]
    pub prompt: Option<String>,

    /// The follow-up action that produced this job, `None` for fresh
    /// generations.
    #[serde(default)]
    pub action: Option<JobAction>,

    /// Raw error message; its presence makes the update terminal.
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse one WebSocket text frame into a typed update.
///
/// Returns `Err` for malformed JSON. Callers should log the frame and
/// continue reading.
pub fn parse_update(text: &str) -> Result<GenerationUpdate, serde_json::Error> {
    serde_json::from_str(text)
}
