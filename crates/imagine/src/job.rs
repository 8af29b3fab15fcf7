//! Job lifecycle model and the progress notification payload.

use palette_core::actions::JobAction;
use palette_core::types::JobId;

use crate::api::GenerationRequest;
use crate::error::GenerationFailure;

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting in the service queue at the given position.
    Queued(u32),
    /// Running, with a completion fraction in `0..1`.
    Running(f64),
    /// Terminal success with the produced image URLs.
    Done(Vec<String>),
    /// Terminal failure: classified kind plus the raw service message.
    Failed {
        kind: GenerationFailure,
        raw: String,
    },
}

impl JobStatus {
    /// Whether the job reached a terminal state. Terminal jobs are
    /// never mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done(_) | JobStatus::Failed { .. })
    }
}

/// One request to the generation service and its lifecycle until
/// terminal. Owned by the orchestrator for the job's duration.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: JobId,
    /// Which image of the source result a follow-up targets.
    pub image_index: Option<u32>,
    /// The initiating prompt; follow-ups inherit it from the service echo.
    pub prompt: Option<String>,
    /// Model identifier for fresh generations.
    pub model: Option<String>,
    pub action: JobAction,
    pub status: JobStatus,
}

impl GenerationJob {
    /// Build the initial job record for an accepted request.
    pub fn from_request(request: &GenerationRequest, id: JobId) -> Self {
        let (image_index, prompt, model) = match request {
            GenerationRequest::Prompt { prompt, model } => {
                (None, Some(prompt.clone()), Some(model.clone()))
            }
            GenerationRequest::FollowUp { image_index, .. } => (Some(*image_index), None, None),
        };

        Self {
            id,
            image_index,
            prompt,
            model,
            action: request.action(),
            status: JobStatus::Queued(0),
        }
    }
}

/// The terminal success payload handed back to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedJob {
    pub id: JobId,
    /// The action that produced this result, as echoed by the service
    /// (falling back to the requested action).
    pub action: JobAction,
    pub prompt: Option<String>,
    pub image_index: Option<u32>,
    pub images: Vec<String>,
}

/// One progress notification for an in-flight job.
///
/// Carries no image data and no terminal flag; the terminal result is
/// the return value of the orchestrator itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobProgress {
    /// Completion fraction in `0..1`, when running.
    pub fraction: Option<f64>,
    /// Zero-based queue position, when waiting.
    pub queue_position: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_seeds_prompt_and_model() {
        let request = GenerationRequest::Prompt {
            prompt: "a lighthouse".into(),
            model: "5.1".into(),
        };
        let job = GenerationJob::from_request(&request, "job-1".into());

        assert_eq!(job.action, JobAction::Generate);
        assert_eq!(job.prompt.as_deref(), Some("a lighthouse"));
        assert_eq!(job.model.as_deref(), Some("5.1"));
        assert!(job.image_index.is_none());
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn follow_up_request_seeds_image_index() {
        let request = GenerationRequest::FollowUp {
            action: JobAction::Upscale,
            source_job_id: "job-1".into(),
            image_index: 2,
        };
        let job = GenerationJob::from_request(&request, "job-2".into());

        assert_eq!(job.action, JobAction::Upscale);
        assert_eq!(job.image_index, Some(2));
        assert!(job.prompt.is_none());
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(JobStatus::Done(vec![]).is_terminal());
        assert!(JobStatus::Failed {
            kind: GenerationFailure::RateLimited,
            raw: "too many images".into(),
        }
        .is_terminal());
        assert!(!JobStatus::Queued(3).is_terminal());
        assert!(!JobStatus::Running(0.5).is_terminal());
    }
}
