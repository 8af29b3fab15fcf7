//! Job orchestration: submit a request, stream progress, return the
//! terminal result.
//!
//! The orchestrator performs no retries and has no side effects —
//! billing and metrics are the caller's responsibility, which keeps
//! this layer independently testable.

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::api::{GenerationRequest, ImagineApi};
use crate::client::ImagineClient;
use crate::config::ImagineConfig;
use crate::error::{classify_failure, ImagineError};
use crate::job::{FinishedJob, GenerationJob, JobProgress, JobStatus};
use crate::messages::{parse_update, GenerationUpdate};

/// Consume an ordered update stream for one job until it turns
/// terminal.
///
/// Non-terminal updates are forwarded to the caller's progress sink in
/// arrival order; the sequence is finite, non-restartable, and ends
/// with exactly one terminal outcome: the return value. Updates for
/// other job ids are skipped. A stream that ends without a terminal
/// update is an error.
pub async fn drive<S>(
    job: &mut GenerationJob,
    mut updates: S,
    progress: &mpsc::Sender<JobProgress>,
) -> Result<FinishedJob, ImagineError>
where
    S: Stream<Item = GenerationUpdate> + Unpin,
{
    while let Some(update) = updates.next().await {
        if update.id != job.id {
            continue;
        }

        if let Some(raw) = update.error {
            let kind = classify_failure(&raw);
            tracing::warn!(job_id = %job.id, error = %raw, "Generation job failed");
            job.status = JobStatus::Failed {
                kind: kind.clone(),
                raw,
            };
            return Err(ImagineError::Job(kind));
        }

        if update.done {
            let images: Vec<String> = update.image.into_iter().collect();
            tracing::info!(
                job_id = %job.id,
                image_count = images.len(),
                "Generation job completed",
            );
            job.status = JobStatus::Done(images.clone());
            if job.prompt.is_none() {
                job.prompt = update.prompt.clone();
            }
            return Ok(FinishedJob {
                id: job.id.clone(),
                action: update.action.unwrap_or(job.action),
                prompt: job.prompt.clone(),
                image_index: job.image_index,
                images,
            });
        }

        match (update.status, update.queued) {
            (Some(fraction), _) => job.status = JobStatus::Running(fraction),
            (None, Some(position)) => job.status = JobStatus::Queued(position),
            (None, None) => {}
        }

        let notification = JobProgress {
            fraction: update.status,
            queue_position: update.queued,
        };
        if progress.send(notification).await.is_err() {
            // The caller stopped listening; keep draining to the
            // terminal state regardless.
            tracing::debug!(job_id = %job.id, "Progress receiver dropped");
        }
    }

    tracing::error!(job_id = %job.id, "Update stream ended without a terminal result");
    Err(ImagineError::StreamEnded)
}

/// Submits generation jobs and sees them through to a terminal state.
pub struct JobOrchestrator {
    api: ImagineApi,
    client: ImagineClient,
}

impl JobOrchestrator {
    /// Create an orchestrator from service configuration.
    pub fn new(config: &ImagineConfig) -> Self {
        Self {
            api: ImagineApi::new(config),
            client: ImagineClient::new(config),
        }
    }

    /// Submit a request and wait for its terminal result.
    ///
    /// Zero or more progress notifications are delivered to `progress`
    /// before this returns. The call does not return until the job is
    /// terminal; there is no cancellation and no internal retry.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        progress: mpsc::Sender<JobProgress>,
    ) -> Result<FinishedJob, ImagineError> {
        let connection = self
            .client
            .connect()
            .await
            .map_err(|e| ImagineError::Connection(e.to_string()))?;

        let accepted = self.api.submit(&request, &connection.client_id).await?;
        tracing::info!(
            job_id = %accepted.id,
            action = request.action().as_str(),
            "Generation job submitted",
        );

        let mut job = GenerationJob::from_request(&request, accepted.id);
        if let Some(position) = accepted.queued {
            job.status = JobStatus::Queued(position);
            let _ = progress
                .send(JobProgress {
                    fraction: None,
                    queue_position: Some(position),
                })
                .await;
        }

        let updates = connection
            .ws_stream
            .take_while(|frame| {
                if let Err(e) = frame {
                    tracing::error!(error = %e, "WebSocket receive error");
                }
                futures::future::ready(frame.is_ok())
            })
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => match parse_update(&text) {
                        Ok(update) => Some(update),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                raw_message = %text,
                                "Failed to parse generation update",
                            );
                            None
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "Update stream closed");
                        None
                    }
                    Ok(_) => None,
                    Err(_) => None,
                }
            });
        futures::pin_mut!(updates);

        drive(&mut job, updates, &progress).await
    }
}
