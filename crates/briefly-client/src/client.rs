use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::request::{
    MAX_MAX_TOKENS, MIN_MAX_TOKENS, RequestOptions, SummaryInput, SummaryRequest, SummaryStyle,
};
use crate::retry::{AlwaysReachable, Reachability, RetryPolicy, run_with_retry};
use crate::session::{SummaryStream, spawn_session};
use crate::stream::FinalSummary;
use crate::summary::StructuredSummary;
use crate::transport::{HttpTransport, Transport};

/// Entry point for building summary requests.
///
/// Cheap to clone; independent requests may run concurrently and share
/// nothing but the underlying connection pool.
#[derive(Clone)]
pub struct SummaryClient {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
    reachability: Arc<dyn Reachability>,
}

impl SummaryClient {
    /// Creates a client backed by an HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Creates a client over an explicit transport (used by tests and
    /// embedders with their own HTTP stack).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry_policy: RetryPolicy::default(),
            reachability: Arc::new(AlwaysReachable),
        }
    }

    /// Overrides the retry policy used by the non-streaming path.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Installs a platform reachability probe for the retry wrapper.
    pub fn reachability(mut self, probe: Arc<dyn Reachability>) -> Self {
        self.reachability = probe;
        self
    }

    /// Starts building a request.
    pub fn request(&self) -> RequestBuilder {
        RequestBuilder {
            transport: self.transport.clone(),
            retry_policy: self.retry_policy.clone(),
            reachability: self.reachability.clone(),
            text: None,
            url: None,
            style: SummaryStyle::Skimmer,
            options: RequestOptions::default(),
        }
    }
}

/// Builder for configuring a single summary request.
///
/// Supply exactly one of `text`/`url`, then finish with `start_stream`,
/// `collect`, or the non-streaming `fetch`.
pub struct RequestBuilder {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
    reachability: Arc<dyn Reachability>,
    text: Option<String>,
    url: Option<String>,
    style: SummaryStyle,
    options: RequestOptions,
}

impl RequestBuilder {
    /// Sets plain text content to summarize.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets a URL the service will extract and summarize.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the summary style.
    pub fn style(mut self, style: SummaryStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the token budget (must stay within 128..=2048).
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    /// Asks the service to send source metadata before the first patch.
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.options.include_metadata = include;
        self
    }

    /// Advisory server-side caching hint.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.options.use_cache = use_cache;
        self
    }

    /// Overrides the delay between progress emissions.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.options.pacing = pacing;
        self
    }

    /// Sets an optional per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the bounded result buffer size between the session task and the
    /// consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the builder state and starts a streaming session.
    pub async fn start_stream(self) -> Result<SummaryStream, ClientError> {
        let (transport, _, _, request) = self.validate_and_build()?;
        Ok(spawn_session(transport, request))
    }

    /// Streams to completion and returns the final document.
    pub async fn collect(self) -> Result<FinalSummary, ClientError> {
        self.start_stream().await?.finish().await
    }

    /// Runs the non-streaming fallback through the retry wrapper.
    ///
    /// Transport failures come back as a categorized
    /// `ClientError::Request`; validation failures are rejected before any
    /// I/O and are never retried.
    pub async fn fetch(self) -> Result<FinalSummary, ClientError> {
        let (transport, retry_policy, reachability, request) = self.validate_and_build()?;
        let body = run_with_retry(&retry_policy, reachability.as_ref(), || {
            let transport = transport.clone();
            let request = request.clone();
            async move { transport.fetch(&request).await }
        })
        .await
        .map_err(ClientError::Request)?;
        decode_final_body(&body)
    }

    #[allow(clippy::type_complexity)]
    fn validate_and_build(
        self,
    ) -> Result<
        (
            Arc<dyn Transport>,
            RetryPolicy,
            Arc<dyn Reachability>,
            SummaryRequest,
        ),
        ClientError,
    > {
        let input = match (self.text, self.url) {
            (Some(_), Some(_)) => {
                return Err(ClientError::Validation(
                    "provide exactly one of text or url, not both".into(),
                ));
            }
            (None, None) => {
                return Err(ClientError::Validation(
                    "either text or url is required".into(),
                ));
            }
            (Some(text), None) => {
                if text.trim().is_empty() {
                    return Err(ClientError::Validation("text must not be empty".into()));
                }
                SummaryInput::Text(text)
            }
            (None, Some(url)) => {
                if url.trim().is_empty() {
                    return Err(ClientError::Validation("url must not be empty".into()));
                }
                SummaryInput::Url(url)
            }
        };
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.options.max_tokens) {
            return Err(ClientError::Validation(format!(
                "max_tokens must be within {MIN_MAX_TOKENS}..={MAX_MAX_TOKENS}"
            )));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(ClientError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }

        let request = SummaryRequest {
            request_id: uuid::Uuid::new_v4(),
            input,
            style: self.style,
            options: self.options,
        };
        Ok((self.transport, self.retry_policy, self.reachability, request))
    }
}

/// Decodes the non-streaming response body into a final summary.
fn decode_final_body(body: &serde_json::Value) -> Result<FinalSummary, ClientError> {
    if let Some(error) = body.get("error").filter(|v| !v.is_null()) {
        let message = error
            .as_str()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(ClientError::Protocol(message));
    }
    let state = body
        .get("state")
        .ok_or_else(|| ClientError::protocol_msg("summarize response missing state"))?;
    let summary: StructuredSummary = serde_json::from_value(state.clone())
        .map_err(|e| ClientError::Protocol(format!("invalid summarize state: {e}")))?;
    let tokens_used = body
        .get("tokens_used")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    let latency_ms = body.get("latency_ms").and_then(serde_json::Value::as_f64);
    Ok(FinalSummary {
        summary,
        tokens_used,
        latency_ms,
    })
}
