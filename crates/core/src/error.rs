use thiserror::Error;

/// Result type alias for parley-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the parley conversation engine
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing to send: blank text and no selected file
    #[error("empty submission")]
    EmptySubmission,

    /// Network or HTTP status failure
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Malformed structured response body
    #[error("Invalid response: {0}")]
    Decode(String),

    /// File catalog could not be fetched
    #[error("{0}")]
    CatalogFetch(String),

    /// A submission is already in flight
    #[error("a reply is still in progress")]
    Busy,

    /// The submission was cancelled by the caller
    #[error("cancelled")]
    Cancelled,

    /// Speech capture errors
    #[error("voice capture error: {0}")]
    Voice(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Text of the Assistant message that surfaces this error in the transcript.
    pub fn transcript_text(&self) -> String {
        format!("Error: {}", self)
    }

    /// Whether the error is one the transcript should never see.
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::EmptySubmission | Error::Busy)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Transport-level failures
///
/// Display strings are user-facing: they end up verbatim after `"Error: "`
/// in the transcript.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("{operation} failed with status {status}")]
    Status { operation: &'static str, status: u16 },

    /// The server answered without a readable body
    #[error("No response body")]
    MissingBody,

    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    Request(String),

    /// The byte stream broke after it started
    #[error("Stream interrupted: {0}")]
    Stream(String),
}

impl TransportError {
    pub fn status(operation: &'static str, status: u16) -> Self {
        Self::Status { operation, status }
    }

    /// HTTP status carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
