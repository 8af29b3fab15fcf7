//! REST client for the generation service HTTP endpoints.
//!
//! Wraps job submission using [`reqwest`]. Streamed updates for a
//! submitted job arrive on the WebSocket connection whose client id
//! was passed along with the submission.

use serde::{Deserialize, Serialize};

use palette_core::actions::JobAction;
use palette_core::types::JobId;

use crate::config::ImagineConfig;

/// A generation request as submitted to the service.
///
/// Either a fresh prompt or a follow-up action against one image of a
/// previously completed job.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationRequest {
    /// Fresh generation from a text prompt.
    Prompt { prompt: String, model: String },

    /// Upscale or variation of one image of an earlier result.
    #[serde(rename_all = "camelCase")]
    FollowUp {
        action: JobAction,
        source_job_id: JobId,
        image_index: u32,
    },
}

impl GenerationRequest {
    /// The job action this request performs.
    pub fn action(&self) -> JobAction {
        match self {
            GenerationRequest::Prompt { .. } => JobAction::Generate,
            GenerationRequest::FollowUp { action, .. } => *action,
        }
    }
}

/// Response returned by the `/generations` endpoint after a job was
/// accepted.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned job identifier.
    pub id: JobId,
    /// Initial queue position, if the job did not start immediately.
    #[serde(default)]
    pub queued: Option<u32>,
}

/// Errors from the generation REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ImagineApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// HTTP client for the generation service.
pub struct ImagineApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ImagineApi {
    /// Create a new API client from service configuration.
    pub fn new(config: &ImagineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Submit a generation request.
    ///
    /// Sends a `POST /generations` with the request body and the
    /// WebSocket client id that streamed updates should be routed to.
    pub async fn submit(
        &self,
        request: &GenerationRequest,
        client_id: &str,
    ) -> Result<SubmitResponse, ImagineApiError> {
        let response = self
            .client
            .post(format!("{}/generations", self.api_url))
            .query(&[("clientId", client_id)])
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ImagineApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ImagineApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ImagineApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ImagineApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_serializes_flat() {
        let request = GenerationRequest::Prompt {
            prompt: "a cat".into(),
            model: "5.1".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "a cat");
        assert_eq!(json["model"], "5.1");
        assert!(json.get("action").is_none());
    }

    #[test]
    fn follow_up_request_serializes_camel_case() {
        let request = GenerationRequest::FollowUp {
            action: JobAction::Variation,
            source_job_id: "job-7".into(),
            image_index: 3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["action"], "variation");
        assert_eq!(json["sourceJobId"], "job-7");
        assert_eq!(json["imageIndex"], 3);
    }

    #[test]
    fn submit_response_tolerates_missing_queue_position() {
        let response: SubmitResponse = serde_json::from_str(r#"{"id":"job-1"}"#).unwrap();
        assert_eq!(response.id, "job-1");
        assert!(response.queued.is_none());
    }
}
