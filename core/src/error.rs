//! Error types for the request pipeline.
//!
//! # Design
//! Every failure reaches the caller as the rejection of a `Pending` request.
//! Callers branch on `QueryError::status()`: `Some` means a response arrived
//! (an HTTP-level failure, or a declared-JSON body that would not decode);
//! `None` means the exchange never produced a usable response (connect
//! failure, socket error, abort).

use std::path::PathBuf;

use crate::http::HttpResponse;

/// Boxed error raised by a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors a request can be rejected with.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The server answered with a status code of 400 or above. The full
    /// aggregated response is carried for inspection.
    #[error("HTTP {}", .0.status)]
    Http(Box<HttpResponse>),

    /// The transport failed before a complete response arrived.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The request was aborted before it settled.
    #[error("request aborted")]
    Aborted,

    /// The response declared a JSON content type but its body did not parse.
    #[error("HTTP {status}: malformed JSON body: {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// An upload source path could not be opened.
    #[error("cannot open upload source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl QueryError {
    /// Status code of the response that caused the failure, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Http(response) => Some(response.status),
            QueryError::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The aggregated response carried by an HTTP failure.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            QueryError::Http(response) => Some(response),
            _ => None,
        }
    }

    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        QueryError::Transport(err.into())
    }
}
