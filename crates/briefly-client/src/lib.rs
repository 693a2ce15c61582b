//! Streaming client for an incremental structured-summary service.
//!
//! The service reveals a summary document (title, main summary, key points,
//! category, sentiment, read time) over a line-framed event stream. Each
//! patch event carries a complete snapshot of the document, so the client
//! folds by wholesale replacement and exposes a deterministic, cancellable
//! sequence of [`ClientResult`]s. A bounded-retry non-streaming fallback is
//! available through [`RequestBuilder::fetch`](client::RequestBuilder::fetch).
//!
//! # Builder-first usage
//!
//! ```no_run
//! use briefly_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = SummaryClient::new(ClientConfig::new("https://api.briefly.example"))?;
//!
//! let mut stream = client
//!     .request()
//!     .url("https://example.com/article")
//!     .style(SummaryStyle::Executive)
//!     .max_tokens(512)
//!     .start_stream()
//!     .await?;
//!
//! while let Some(result) = stream.next_result().await {
//!     match result {
//!         ClientResult::Progress { state, .. } => println!("so far: {:?}", state.title),
//!         ClientResult::Complete { summary, .. } => println!("done: {summary:?}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Client entry point and request builder.
pub mod client;
/// Event codec: line framing and per-line decoding.
pub mod codec;
/// Client configuration.
pub mod config;
/// Advisory patch-operation interpreter.
pub mod delta;
/// Public error types used by the client API.
pub mod errors;
/// Wire-level stream events.
pub mod events;
/// Common imports for typical usage.
pub mod prelude;
/// Request model, styles, and per-request options.
pub mod request;
/// Bounded-retry wrapper for the non-streaming path.
pub mod retry;
/// Streaming session state machine and cancellation handle.
pub mod session;
/// Client-visible results and the final summary type.
pub mod stream;
/// The structured-summary document and fold operation.
pub mod summary;
/// HTTP boundary and transport abstraction.
pub mod transport;

pub use client::{RequestBuilder, SummaryClient};
pub use codec::decode_line;
pub use config::ClientConfig;
pub use delta::{PatchOperation, classify};
pub use errors::{
    ClientError, DecodeError, ErrorCategory, SessionFailure, TransportError, TransportErrorKind,
    UserFacingError,
};
pub use events::{StreamEvent, StreamMetadata};
pub use request::{RequestOptions, SummaryInput, SummaryRequest, SummaryStyle};
pub use retry::{AlwaysReachable, Reachability, RetryPolicy, run_with_retry};
pub use session::{CancelHandle, SummaryStream};
pub use stream::{ClientResult, FinalSummary};
pub use summary::{Sentiment, StructuredSummary, fold};
pub use transport::{ByteStream, HttpTransport, Transport};
