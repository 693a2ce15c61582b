use std::time::Duration;

use crate::errors::ClientError;

/// Configuration for the summary service client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the summary service.
    pub base_url: String,
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `BRIEFLY_BASE_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("BRIEFLY_BASE_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ClientError::Config(
                "missing BRIEFLY_BASE_URL for the summary service".into(),
            ));
        }
        Ok(Self::new(base_url))
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/api/summarize/stream",
            self.base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn summarize_url(&self) -> String {
        format!("{}/api/summarize", self.base_url.trim_end_matches('/'))
    }
}
