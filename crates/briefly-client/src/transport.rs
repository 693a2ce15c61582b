use std::pin::Pin;

use futures::StreamExt as _;

use crate::config::ClientConfig;
use crate::errors::{ClientError, TransportError};
use crate::request::SummaryRequest;

/// Response body chunks from an open streaming request.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// HTTP boundary of the client.
///
/// Sessions and the retry wrapper depend on this trait rather than on
/// `reqwest` directly, so tests can drive them with scripted transports.
/// Dropping a returned `ByteStream` closes the underlying connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Opens the streaming endpoint and returns the response body.
    async fn open_stream(&self, request: &SummaryRequest) -> Result<ByteStream, TransportError>;

    /// Executes the non-streaming endpoint and returns the response body.
    async fn fetch(&self, request: &SummaryRequest) -> Result<serde_json::Value, TransportError>;
}

/// `reqwest`-backed transport for the summary service.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn post(&self, url: String, request: &SummaryRequest, stream: bool) -> reqwest::RequestBuilder {
        let mut http_req = self.client.post(url).json(&request.body(stream));
        if let Some(timeout) = request.options.timeout {
            http_req = http_req.timeout(timeout);
        }
        http_req
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: &SummaryRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .post(self.config.stream_url(), request, true)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(
                status.as_u16(),
                format!("stream request failed with status {status}: {body}"),
            ));
        }
        Ok(Box::pin(response.bytes_stream().map(|item| {
            item.map_err(|e| TransportError::from_reqwest(&e))
        })))
    }

    async fn fetch(&self, request: &SummaryRequest) -> Result<serde_json::Value, TransportError> {
        let response = self
            .post(self.config.summarize_url(), request, false)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(
                status.as_u16(),
                format!("summarize request failed with status {status}: {body}"),
            ));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))
    }
}
