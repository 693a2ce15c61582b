use crate::delta::PatchOperation;
use crate::summary::StructuredSummary;

/// Source/context description sent once at the start of a stream, before any
/// patch event.
///
/// Fields other than `input_type` and `style` are only present when the
/// request went through URL extraction; for plain-text input they are absent
/// (not null) on the wire.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamMetadata {
    /// `"text"` or `"url"`.
    #[serde(default)]
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    /// Extraction strategy that produced the article text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<u64>,
    /// Summary style the service is generating.
    #[serde(default)]
    pub style: String,
}

/// Wire-level event decoded from one protocol line.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// At most one per stream, always first when present.
    Metadata(StreamMetadata),
    /// Incremental snapshot of the summary document.
    Patch {
        /// Advisory description of what changed; never used to compute state.
        delta: Option<PatchOperation>,
        /// Authoritative, complete snapshot of the document.
        state: StructuredSummary,
        /// Terminal flag; `true` marks the last event of a successful stream.
        done: bool,
        tokens_used: u64,
        /// Only meaningful on the terminal event.
        latency_ms: Option<f64>,
    },
    /// Terminal server-side failure.
    Error { message: String, tokens_used: u64 },
}
