/// Failure to decode a single protocol line.
///
/// Malformed lines are recovered locally: the session logs them and keeps
/// reading, so this error never crosses the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The line matched the event prefix but its payload was not a valid
    /// event object.
    #[error("malformed event line ({excerpt}): {reason}")]
    Malformed { excerpt: String, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(payload: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            excerpt: excerpt(payload),
            reason: reason.into(),
        }
    }
}

const EXCERPT_LEN: usize = 48;

fn excerpt(payload: &str) -> String {
    let mut end = payload.len().min(EXCERPT_LEN);
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    if end < payload.len() {
        format!("{}…", &payload[..end])
    } else {
        payload.to_string()
    }
}

/// Coarse classification of a transport failure, used for retry and
/// user-facing categorization decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Hostname resolution failed. Non-transient; never retried.
    Dns,
    /// The service actively refused the connection. Non-transient.
    ConnectRefused,
    /// The request or a read timed out.
    Timeout,
    /// The connection was reset or aborted mid-stream.
    Reset,
    /// The service answered with a non-success HTTP status.
    Http,
    /// Anything else.
    Other,
}

/// Network or HTTP failure below the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// HTTP status, only present for `TransportErrorKind::Http`.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect_refused(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectRefused, message)
    }

    pub fn dns(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Dns, message)
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Http,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classifies a `reqwest` error by walking its source chain for the
    /// underlying I/O error kind.
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if let Some(io) = io_source(err) {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectRefused,
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => TransportErrorKind::Reset,
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                _ if err.is_connect() => TransportErrorKind::ConnectRefused,
                _ => TransportErrorKind::Other,
            }
        } else if err.is_connect() {
            // Resolver failures surface as connect errors without an I/O source.
            TransportErrorKind::Dns
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

fn io_source(err: &reqwest::Error) -> Option<&std::io::Error> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}

/// Terminal failure of a streaming session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    /// The service sent an explicit error event, or the stream ended without
    /// a terminal event.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The connection or a read failed mid-stream.
    #[error(transparent)]
    Transport(TransportError),
    /// The consumer cancelled the session.
    #[error("session cancelled")]
    Cancelled,
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request input, rejected before any I/O.
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport failure before a session was established.
    #[error(transparent)]
    Transport(TransportError),
    /// Terminal failure of a started streaming session.
    #[error(transparent)]
    SessionFailed(SessionFailure),
    /// Categorized failure from the retried non-streaming path.
    #[error(transparent)]
    Request(UserFacingError),
    /// The session was cancelled before a terminal result was produced.
    #[error("cancelled")]
    Cancelled,
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<SessionFailure> for ClientError {
    fn from(value: SessionFailure) -> Self {
        ClientError::SessionFailed(value)
    }
}

/// Category shown to the end consumer for a failed non-streaming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    Unreachable,
    NoNetwork,
    Other,
}

/// The categorized, presentable form of a request failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UserFacingError {
    pub category: ErrorCategory,
    pub message: &'static str,
}

const NO_NETWORK_MESSAGE: &str = "No network connection. Reconnect and try again.";
const GENERIC_MESSAGE: &str = "Network error. Please try again.";

/// Kind-to-category table. Kinds absent here fall back to the generic entry.
const CATEGORY_TABLE: &[(TransportErrorKind, ErrorCategory, &str)] = &[
    (
        TransportErrorKind::Timeout,
        ErrorCategory::Timeout,
        "The service is taking longer than expected. Please try again.",
    ),
    (
        TransportErrorKind::Dns,
        ErrorCategory::Unreachable,
        "Cannot reach the summary service. Check your network connection.",
    ),
    (
        TransportErrorKind::ConnectRefused,
        ErrorCategory::Unreachable,
        "Cannot reach the summary service. Check your network connection.",
    ),
];

impl UserFacingError {
    /// Looks up the category and message for a transport failure.
    pub fn from_transport(err: &TransportError) -> Self {
        for (kind, category, message) in CATEGORY_TABLE {
            if *kind == err.kind {
                return Self {
                    category: *category,
                    message,
                };
            }
        }
        Self {
            category: ErrorCategory::Other,
            message: GENERIC_MESSAGE,
        }
    }

    /// The reachability probe reported no network before an attempt.
    pub fn no_network() -> Self {
        Self {
            category: ErrorCategory::NoNetwork,
            message: NO_NETWORK_MESSAGE,
        }
    }
}
