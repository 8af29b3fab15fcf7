//! Failure classification and the orchestrator error type.

use crate::api::ImagineApiError;

/// Substring the service includes in rate-limit errors.
pub const TRAFFIC_OVERLOAD_MARKER: &str = "many images";

/// Substring the service includes in moderation errors.
pub const MODERATION_MARKER: &str = "Flagged";

/// A classified terminal job failure.
///
/// The `Display` strings are the short user-facing messages rendered
/// for each kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    /// The service is shedding load.
    #[error("We are currently dealing with too much traffic; please try your request again later")]
    RateLimited,

    /// The prompt tripped the service-side moderation filters.
    #[error("Your prompt was blocked by the moderation filters; please try a different prompt")]
    ContentFlagged,

    /// Anything else; carries the raw service message verbatim.
    #[error("{0}; please try your request again later")]
    Generic(String),
}

/// Classify a raw error message from the service.
///
/// Pattern order matters: the traffic marker wins over the moderation
/// marker, and everything else falls through verbatim.
pub fn classify_failure(raw: &str) -> GenerationFailure {
    if raw.contains(TRAFFIC_OVERLOAD_MARKER) {
        GenerationFailure::RateLimited
    } else if raw.contains(MODERATION_MARKER) {
        GenerationFailure::ContentFlagged
    } else {
        GenerationFailure::Generic(raw.to_string())
    }
}

/// Errors surfaced by the job orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ImagineError {
    /// The submission HTTP call failed.
    #[error(transparent)]
    Api(#[from] ImagineApiError),

    /// The update WebSocket could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The update stream ended before a terminal result arrived.
    #[error("Update stream ended before a terminal result")]
    StreamEnded,

    /// The job itself failed; the classified failure is user-facing.
    #[error(transparent)]
    Job(#[from] GenerationFailure),
}

impl ImagineError {
    /// Collapse this error into a user-facing failure.
    ///
    /// Job failures keep their classification; transport-level errors
    /// surface as a generic failure with the transport message.
    pub fn into_failure(self) -> GenerationFailure {
        match self {
            ImagineError::Job(failure) => failure,
            other => GenerationFailure::Generic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_marker_classifies_as_rate_limited() {
        assert_eq!(
            classify_failure("there are too many images queued right now"),
            GenerationFailure::RateLimited
        );
    }

    #[test]
    fn moderation_marker_classifies_as_content_flagged() {
        assert_eq!(
            classify_failure("Flagged by the safety system"),
            GenerationFailure::ContentFlagged
        );
    }

    #[test]
    fn traffic_marker_wins_over_moderation_marker() {
        assert_eq!(
            classify_failure("Flagged: too many images"),
            GenerationFailure::RateLimited
        );
    }

    #[test]
    fn unknown_message_passes_through_verbatim() {
        assert_eq!(
            classify_failure("GPU worker crashed"),
            GenerationFailure::Generic("GPU worker crashed".to_string())
        );
    }

    #[test]
    fn transport_errors_collapse_to_generic() {
        let failure = ImagineError::StreamEnded.into_failure();
        assert!(matches!(failure, GenerationFailure::Generic(_)));

        let failure = ImagineError::Job(GenerationFailure::RateLimited).into_failure();
        assert_eq!(failure, GenerationFailure::RateLimited);
    }
}
