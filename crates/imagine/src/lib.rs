//! Client library for the external image-generation service.
//!
//! Provides the REST submission wrapper, the WebSocket update stream,
//! typed wire messages, failure classification, and the job
//! orchestrator that turns a submitted request into a terminal result
//! while streaming progress to the caller.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod messages;
pub mod orchestrator;

pub use api::GenerationRequest;
pub use error::{GenerationFailure, ImagineError};
pub use job::{FinishedJob, JobProgress};
pub use orchestrator::JobOrchestrator;
