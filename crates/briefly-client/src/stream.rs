use crate::delta::PatchOperation;
use crate::events::StreamMetadata;
use crate::summary::StructuredSummary;

/// Client-visible results emitted by a streaming session, in order.
///
/// Exactly one of `Complete`/`Error` is emitted per session, always last.
/// A cancelled session emits neither; cancellation surfaces through
/// `SummaryStream::finish`.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientResult {
    /// Source metadata, at most once and before any progress.
    Metadata(StreamMetadata),
    /// A non-terminal snapshot of the evolving document.
    Progress {
        state: StructuredSummary,
        tokens_used: u64,
        /// Advisory hint of what just changed, for UI highlighting only.
        delta: Option<PatchOperation>,
    },
    /// Terminal success with the frozen final document.
    Complete {
        summary: StructuredSummary,
        tokens_used: u64,
        latency_ms: Option<f64>,
    },
    /// Terminal failure.
    Error { message: String },
}

/// Final outcome of a successful run, returned by `SummaryStream::finish`
/// and by the non-streaming fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalSummary {
    pub summary: StructuredSummary,
    pub tokens_used: u64,
    pub latency_ms: Option<f64>,
}
