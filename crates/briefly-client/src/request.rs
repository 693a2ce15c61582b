use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The single content input for a request: plain text or a URL the service
/// will extract text from. The builder enforces that exactly one is given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryInput {
    Text(String),
    Url(String),
}

/// Requested summary style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    /// Quick-scan bullets.
    Skimmer,
    /// Dense executive brief.
    Executive,
    /// Plain-language explanation.
    Eli5,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skimmer => "skimmer",
            Self::Executive => "executive",
            Self::Eli5 => "eli5",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skimmer" => Ok(Self::Skimmer),
            "executive" => Ok(Self::Executive),
            "eli5" => Ok(Self::Eli5),
            other => Err(format!("unknown summary style: {other}")),
        }
    }
}

/// Inclusive bounds for the token budget.
pub const MIN_MAX_TOKENS: u32 = 128;
pub const MAX_MAX_TOKENS: u32 = 2048;

/// Per-request behavior options.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    /// Token budget for the generated summary.
    pub max_tokens: u32,
    /// Ask the service to send a metadata event before the first patch.
    pub include_metadata: bool,
    /// Advisory server-side caching hint; does not change client behavior.
    pub use_cache: bool,
    /// Delay between non-terminal progress emissions. Smooths consumer-side
    /// rendering; it is not backpressure and does not slow the socket reads.
    pub pacing: Duration,
    /// Optional per-request timeout overriding the client default.
    pub timeout: Option<Duration>,
    /// Bounded result buffer size between the session task and the consumer.
    pub stream_buffer_capacity: usize,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            include_metadata: true,
            use_cache: true,
            pacing: Duration::from_millis(30),
            timeout: None,
            stream_buffer_capacity: 128,
        }
    }
}

/// A validated request, ready to be sent.
#[derive(Clone, Debug)]
pub struct SummaryRequest {
    pub request_id: uuid::Uuid,
    pub input: SummaryInput,
    pub style: SummaryStyle,
    pub options: RequestOptions,
}

impl SummaryRequest {
    /// Renders the JSON request body with the service's wire field names.
    pub(crate) fn body(&self, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "style": self.style,
            "max_tokens": self.options.max_tokens,
            "include_metadata": self.options.include_metadata,
            "use_cache": self.options.use_cache,
            "stream": stream,
        });
        match &self.input {
            SummaryInput::Text(text) => body["text"] = serde_json::json!(text),
            SummaryInput::Url(url) => body["url"] = serde_json::json!(url),
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(input: SummaryInput) -> SummaryRequest {
        SummaryRequest {
            request_id: uuid::Uuid::new_v4(),
            input,
            style: SummaryStyle::Executive,
            options: RequestOptions::default(),
        }
    }

    #[test]
    fn body_carries_exactly_one_input_key() {
        let text_body = request(SummaryInput::Text("hello".into())).body(true);
        assert_eq!(text_body.get("text").and_then(|v| v.as_str()), Some("hello"));
        assert!(text_body.get("url").is_none());

        let url_body = request(SummaryInput::Url("https://example.com/a".into())).body(false);
        assert!(url_body.get("text").is_none());
        assert_eq!(
            url_body.get("url").and_then(|v| v.as_str()),
            Some("https://example.com/a")
        );
        assert_eq!(url_body.get("stream").and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn body_serializes_style_and_budget() {
        let body = request(SummaryInput::Text("hi".into())).body(true);
        assert_eq!(body.get("style").and_then(|v| v.as_str()), Some("executive"));
        assert_eq!(body.get("max_tokens").and_then(|v| v.as_u64()), Some(512));
        assert_eq!(body.get("stream").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn style_parses_from_wire_names() {
        assert_eq!("skimmer".parse(), Ok(SummaryStyle::Skimmer));
        assert_eq!("eli5".parse(), Ok(SummaryStyle::Eli5));
        assert!("verbose".parse::<SummaryStyle>().is_err());
    }
}
