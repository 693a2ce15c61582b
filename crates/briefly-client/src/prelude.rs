//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used builder and
//! result types so application code needs fewer import lines.
pub use crate::{
    CancelHandle, ClientConfig, ClientError, ClientResult, FinalSummary, RequestBuilder,
    Sentiment, StructuredSummary, SummaryClient, SummaryStream, SummaryStyle, UserFacingError,
};
