//! Failure taxonomy for remote calls.
//!
//! Every failure of the access layer maps to exactly one [`ApiError`]
//! variant. The `Display` text is what the state manager shows the user.

use reqwest::StatusCode;
use thiserror::Error;

/// Cause of a transport-level failure, where it can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Request or resource timeout elapsed.
    Timeout,
    /// Could not reach the server at all.
    NoConnectivity,
    /// Connection dropped mid-exchange.
    ConnectionLost,
    Other,
}

/// Error returned by every [`Api`](super::Api) operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidRequest(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decoding(String),

    #[error("Network error: {detail}")]
    Network {
        kind: NetworkErrorKind,
        detail: String,
    },
}

impl ApiError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    pub fn network(kind: NetworkErrorKind, detail: impl Into<String>) -> Self {
        Self::Network {
            kind,
            detail: detail.into(),
        }
    }

    /// Map a non-success status and its raw body.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized
        } else {
            Self::Http {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Map a reqwest transport failure.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::NoConnectivity
        } else if err.is_body() || err.is_request() {
            NetworkErrorKind::ConnectionLost
        } else {
            NetworkErrorKind::Other
        };
        Self::network(kind, err.to_string())
    }

    /// Map a failure while reading a response body. Headers already
    /// arrived, so anything but a timeout means the connection dropped.
    pub fn from_body_read(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else {
            NetworkErrorKind::ConnectionLost
        };
        Self::network(kind, err.to_string())
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server reported the resource already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT.as_u16())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Check if this error is worth retrying by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}
