//! The follow-up action state machine.
//!
//! Each interaction event moves through Received (parse) -> Locked
//! (control activation committed to the message) -> Submitted (job or
//! persistence call) -> Settled (metrics, billing, next layout). The
//! Locked step always runs before Submitted, so a racing duplicate
//! press finds an already-disabled control and is ignored.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use palette_core::actions::{
    parse_control_id, rating_for_glyph, FollowUpKind, FollowUpRequest, JobAction,
};
use palette_core::controls::{activate_control, build_follow_up_rows, ControlLayout};
use palette_core::types::UserId;
use palette_imagine::{
    FinishedJob, GenerationFailure, GenerationRequest, ImagineError, JobProgress,
};
use palette_metrics::{MetricCategory, MetricsAggregator};

use crate::collaborators::{
    BillingService, DispatchError, JobRunner, MessageSurface, ModerationGate, RatingStore,
};

/// Buffer size of the per-job progress channel.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Failure copy for a control identifier the dispatcher cannot parse.
const MALFORMED_CONTROL_MESSAGE: &str = "This control is no longer valid";

/// A pressed follow-up control, as delivered by the interaction layer.
#[derive(Debug, Clone)]
pub struct FollowUpEvent {
    /// Identifier of the pressed control.
    pub control_id: String,
    /// Glyph of the pressed control, when it carries one.
    pub glyph: Option<String>,
    /// The user who pressed the control.
    pub acting_user_id: UserId,
    /// Snapshot of the full control layout on the message.
    pub layout: ControlLayout,
}

/// How a dispatched event settled.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The action ran to completion; the new layout was presented.
    Completed(ControlLayout),
    /// The action failed with a user-visible, classified error.
    Failed(GenerationFailure),
    /// The event was acknowledged and dropped on purpose (duplicate
    /// press, ownership mismatch, vanished rating record).
    Ignored,
}

/// Dispatches generation commands and follow-up presses against the
/// orchestrator, metrics, billing, and persistence collaborators.
pub struct ActionDispatcher {
    runner: Arc<dyn JobRunner>,
    billing: Arc<dyn BillingService>,
    moderation: Arc<dyn ModerationGate>,
    ratings: Arc<dyn RatingStore>,
    metrics: Arc<MetricsAggregator>,
}

impl ActionDispatcher {
    pub fn new(
        runner: Arc<dyn JobRunner>,
        billing: Arc<dyn BillingService>,
        moderation: Arc<dyn ModerationGate>,
        ratings: Arc<dyn RatingStore>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            runner,
            billing,
            moderation,
            ratings,
            metrics,
        }
    }

    /// Run an initial generation command.
    ///
    /// The prompt passes the moderation gate before any job is
    /// created; a blocked prompt is surfaced and nothing is submitted.
    pub async fn handle_generate(
        &self,
        surface: Arc<dyn MessageSurface>,
        user_id: UserId,
        prompt: String,
        model: String,
    ) -> Result<DispatchOutcome, DispatchError> {
        let verdict = self
            .moderation
            .check_prompt(&user_id, &prompt, &model)
            .await?;
        if verdict.blocked {
            tracing::info!(user_id = %user_id, "Prompt blocked by moderation");
            let failure = GenerationFailure::ContentFlagged;
            surface.show_failure(&failure.to_string()).await?;
            return Ok(DispatchOutcome::Failed(failure));
        }

        let request = GenerationRequest::Prompt { prompt, model };
        match self.run_job(Arc::clone(&surface), request).await {
            Ok(job) => {
                let controls = self
                    .settle_success(surface.as_ref(), &user_id, "generation", &job)
                    .await?;
                Ok(DispatchOutcome::Completed(controls))
            }
            Err(failure) => {
                surface.show_failure(&failure.to_string()).await?;
                Ok(DispatchOutcome::Failed(failure))
            }
        }
    }

    /// Dispatch one follow-up press.
    pub async fn handle_follow_up(
        &self,
        surface: Arc<dyn MessageSurface>,
        event: FollowUpEvent,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request = match parse_control_id(&event.control_id) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    control_id = %event.control_id,
                    error = %e,
                    "Rejected malformed follow-up control",
                );
                let failure = GenerationFailure::Generic(MALFORMED_CONTROL_MESSAGE.into());
                surface.show_failure(&failure.to_string()).await?;
                return Ok(DispatchOutcome::Failed(failure));
            }
        };

        match request.kind {
            FollowUpKind::Upscale => {
                self.handle_job_follow_up(surface, event, request, JobAction::Upscale)
                    .await
            }
            FollowUpKind::Variation => {
                self.handle_job_follow_up(surface, event, request, JobAction::Variation)
                    .await
            }
            FollowUpKind::Rate => self.handle_rating(surface, event, request).await,
        }
    }

    // ---- per-kind handlers ----

    /// Upscale / variation: lock the pressed control, push the locked
    /// layout, then submit the follow-up job.
    async fn handle_job_follow_up(
        &self,
        surface: Arc<dyn MessageSurface>,
        event: FollowUpEvent,
        request: FollowUpRequest,
        action: JobAction,
    ) -> Result<DispatchOutcome, DispatchError> {
        // The lock transition must consume a still-enabled control; a
        // duplicate press finds it disabled and stops here.
        if !event.layout.is_enabled(&event.control_id) {
            tracing::debug!(control_id = %event.control_id, "Duplicate follow-up press ignored");
            surface.acknowledge().await?;
            return Ok(DispatchOutcome::Ignored);
        }

        // Commit the lock to the shared message before submitting.
        let locked = activate_control(&event.control_id, &event.layout);
        surface.replace_controls(&locked).await?;

        let job_request = GenerationRequest::FollowUp {
            action,
            source_job_id: request.job_id,
            image_index: request.image_index,
        };

        match self.run_job(Arc::clone(&surface), job_request).await {
            Ok(job) => {
                let controls = self
                    .settle_success(
                        surface.as_ref(),
                        &event.acting_user_id,
                        request.kind.as_str(),
                        &job,
                    )
                    .await?;
                Ok(DispatchOutcome::Completed(controls))
            }
            Err(failure) => {
                surface.show_failure(&failure.to_string()).await?;
                Ok(DispatchOutcome::Failed(failure))
            }
        }
    }

    /// Rate: owner-gated, no external job; merges the rating into the
    /// persisted record for the job.
    async fn handle_rating(
        &self,
        surface: Arc<dyn MessageSurface>,
        event: FollowUpEvent,
        request: FollowUpRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        // Only the recorded owner may rate. A mismatch is acknowledged
        // without any visible reaction so ownership is not revealed.
        if event.acting_user_id != request.user_id {
            surface.acknowledge().await?;
            return Ok(DispatchOutcome::Ignored);
        }

        let glyph = event.glyph.as_deref().unwrap_or_default();
        let rating = match rating_for_glyph(glyph) {
            Ok(option) => option,
            Err(e) => {
                tracing::warn!(control_id = %event.control_id, error = %e, "Unresolvable rating");
                let failure = GenerationFailure::Generic(MALFORMED_CONTROL_MESSAGE.into());
                surface.show_failure(&failure.to_string()).await?;
                return Ok(DispatchOutcome::Failed(failure));
            }
        };

        if !event.layout.is_enabled(&event.control_id) {
            surface.acknowledge().await?;
            return Ok(DispatchOutcome::Ignored);
        }

        // Lock only the pressed rating control, then acknowledge.
        let locked = activate_control(&event.control_id, &event.layout);
        surface.replace_controls(&locked).await?;
        surface.acknowledge().await?;

        self.record_image_metric(nested_increment("rate", rating.value))
            .await;

        let Some(mut payload) = self.ratings.fetch(&request.job_id).await? else {
            // The rated record vanished between completion and the
            // vote; the vote is dropped. Possible data loss, so it is
            // at least surfaced in the logs.
            tracing::warn!(job_id = %request.job_id, "Rating target not found; vote dropped");
            return Ok(DispatchOutcome::Ignored);
        };

        match payload.as_object_mut() {
            Some(map) => {
                map.insert("rating".into(), Value::from(rating.value));
            }
            None => payload = json!({ "rating": rating.value }),
        }
        self.ratings.persist(&request.job_id, payload).await?;

        Ok(DispatchOutcome::Completed(locked))
    }

    // ---- settled-phase helpers ----

    /// Submit a request and forward its progress notifications to the
    /// surface until the job turns terminal.
    async fn run_job(
        &self,
        surface: Arc<dyn MessageSurface>,
        request: GenerationRequest,
    ) -> Result<FinishedJob, GenerationFailure> {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let forwarder = tokio::spawn(forward_progress(surface, rx));

        let result = self.runner.submit(request, tx).await;

        // The sender is gone once submit returns, so the forwarder
        // drains and exits on its own.
        if let Err(e) = forwarder.await {
            tracing::error!(error = %e, "Progress forwarder panicked");
        }

        result.map_err(ImagineError::into_failure)
    }

    /// Metrics, billing, and the next control layout for a terminal
    /// success. Metric and billing failures are logged and never abort
    /// the flow.
    async fn settle_success(
        &self,
        surface: &dyn MessageSurface,
        user_id: &UserId,
        metric_field: &str,
        job: &FinishedJob,
    ) -> Result<ControlLayout, DispatchError> {
        self.record_image_metric(increment(metric_field)).await;

        if let Err(e) = self.billing.charge_for_image(user_id, job).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to charge for image");
        }

        let controls = build_follow_up_rows(
            job.action,
            user_id,
            &job.id,
            job.image_index.unwrap_or(0),
        );
        surface.present_result(job, &controls).await?;
        Ok(controls)
    }

    async fn record_image_metric(&self, updates: Map<String, Value>) {
        if let Err(e) = self.metrics.change(MetricCategory::Image, updates).await {
            tracing::error!(error = %e, "Failed to record image metric");
        }
    }
}

/// Forward progress notifications to the message surface until the
/// job's sender side closes.
async fn forward_progress(
    surface: Arc<dyn MessageSurface>,
    mut progress: mpsc::Receiver<JobProgress>,
) {
    while let Some(notification) = progress.recv().await {
        if let Err(e) = surface.show_progress(&notification).await {
            tracing::warn!(error = %e, "Failed to render progress update");
        }
    }
}

/// `{field: "+1"}`
fn increment(field: &str) -> Map<String, Value> {
    let mut updates = Map::new();
    updates.insert(field.to_string(), Value::from("+1"));
    updates
}

/// `{field: {key: "+1"}}`
fn nested_increment(field: &str, key: &str) -> Map<String, Value> {
    let mut updates = Map::new();
    updates.insert(field.to_string(), json!({ key: "+1" }));
    updates
}
