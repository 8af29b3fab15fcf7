//! WebSocket client for the generation service update stream.
//!
//! [`ImagineClient`] holds the connection configuration. Call
//! [`ImagineClient::connect`] to establish a live
//! [`ImagineConnection`] whose stream carries updates for every job
//! submitted under its client id.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

use crate::config::ImagineConfig;

/// Configuration handle for the service's update endpoint.
pub struct ImagineClient {
    ws_url: String,
}

/// A live WebSocket connection to the update endpoint.
pub struct ImagineConnection {
    /// Unique client id sent during the handshake; submissions quoting
    /// it receive their updates on this connection.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ImagineClient {
    /// Create a new client from service configuration.
    pub fn new(config: &ImagineConfig) -> Self {
        Self {
            ws_url: config.ws_url.clone(),
        }
    }

    /// Connect to the update WebSocket endpoint.
    ///
    /// Generates a unique `client_id` (UUID v4) and appends it as a
    /// query parameter so the service can route job updates back to
    /// this connection.
    pub async fn connect(&self) -> Result<ImagineConnection, ImagineClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/updates?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ImagineClientError::Connection(format!(
                "Failed to connect to generation service at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            client_id = %client_id,
            "Connected to generation service at {}",
            self.ws_url,
        );

        Ok(ImagineConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ImagineClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
