//! Error types for the loan backend client.

use std::fmt;

use thiserror::Error;

/// The backend operation an error came from.
///
/// The verb prefixes every user-facing error line, e.g. `Chat error: 500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVerb {
    Chat,
    Apply,
    Upload,
}

impl fmt::Display for ApiVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Chat => "Chat",
            Self::Apply => "Apply",
            Self::Upload => "Upload",
        };
        f.write_str(verb)
    }
}

/// Backend client error.
///
/// Non-2xx responses carry only the status; error bodies are never parsed.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Backend answered outside the 2xx range.
    #[error("{verb} error: {status}")]
    Status {
        /// Operation that failed.
        verb: ApiVerb,
        /// HTTP status code.
        status: u16,
    },

    /// Request never produced a response (connection refused, DNS, reset).
    #[error("{verb} error: {source}")]
    Transport {
        verb: ApiVerb,
        #[source]
        source: reqwest::Error,
    },

    /// 2xx response whose body was not the expected JSON.
    #[error("{verb} error: invalid response body ({source})")]
    Decode {
        verb: ApiVerb,
        #[source]
        source: reqwest::Error,
    },

    /// Multipart part could not be built from the uploaded file.
    #[error("{verb} error: {message}")]
    InvalidRequest { verb: ApiVerb, message: String },

    /// Configured backend base URL is not a valid URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, ApiError>;
