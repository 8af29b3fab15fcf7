/// Generation service configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ImagineConfig {
    /// Base HTTP URL of the generation API (default: `http://localhost:8787`).
    pub api_url: String,
    /// Base WebSocket URL for streamed updates (default: `ws://localhost:8787`).
    pub ws_url: String,
    /// Bearer token sent with every submission.
    pub api_key: String,
}

impl ImagineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                 |
    /// |-------------------|-------------------------|
    /// | `IMAGINE_API_URL` | `http://localhost:8787` |
    /// | `IMAGINE_WS_URL`  | `ws://localhost:8787`   |
    /// | `IMAGINE_API_KEY` | empty                   |
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("IMAGINE_API_URL").unwrap_or_else(|_| "http://localhost:8787".into());
        let ws_url =
            std::env::var("IMAGINE_WS_URL").unwrap_or_else(|_| "ws://localhost:8787".into());
        let api_key = std::env::var("IMAGINE_API_KEY").unwrap_or_default();

        Self {
            api_url,
            ws_url,
            api_key,
        }
    }
}
