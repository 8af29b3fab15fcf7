//! Follow-up action dispatch.
//!
//! Receives interaction events for generation results, locks the
//! pressed control, drives the generation job (or rating persistence),
//! and settles metrics, billing, and the next control layout.

pub mod collaborators;
pub mod dispatcher;

pub use collaborators::{
    BillingService, DispatchError, JobRunner, MessageSurface, ModerationGate, ModerationVerdict,
    RatingStore,
};
pub use dispatcher::{ActionDispatcher, DispatchOutcome, FollowUpEvent};
