//! Classified errors returned by the gateway client.
//!
//! Every failed call ends up here: non-2xx responses, transport failures and
//! undecodable bodies alike. Callers match on [`ErrorKind`] instead of
//! inspecting `reqwest` or `serde_json` errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401: the server rejected the supplied credentials.
    Unauthenticated,
    /// 403: the caller is not allowed to perform the request.
    Unauthorized,
    /// 429: the server's admission limiter rejected the request.
    RateLimitExceeded,
    /// 5xx responses.
    RemoteServerError,
    /// Any other non-2xx response.
    UnclassifiedHttpError,
    /// No response was received (connection refused, timeout, reset).
    Network,
    /// A 2xx response announced JSON but the body could not be decoded.
    InvalidResponse,
    /// The request could not be built (bad URL, unserializable body).
    InvalidRequest,
}

/// A failed call, carrying the HTTP status and a human-readable message.
///
/// `status` is `0` when the failure happened before any response arrived.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    pub kind: ErrorKind,
}

impl HttpError {
    /// Classify a non-success HTTP status using its standard reason phrase.
    pub fn from_status(status: StatusCode) -> Self {
        Self::from_status_reason(status, None)
    }

    /// Classify a non-success HTTP status, describing unmapped statuses with
    /// the reason phrase the server sent.
    pub fn from_status_reason(status: StatusCode, reason: Option<&str>) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
            StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
            s if s.is_server_error() => ErrorKind::RemoteServerError,
            _ => ErrorKind::UnclassifiedHttpError,
        };

        Self {
            status: status.as_u16(),
            message: describe_status(status, reason),
            kind,
        }
    }

    pub(crate) fn network(err: reqwest::Error) -> Self {
        Self {
            status: 0,
            message: format!("network failure: {err}"),
            kind: ErrorKind::Network,
        }
    }

    pub(crate) fn invalid_response(status: u16, detail: impl std::fmt::Display) -> Self {
        Self {
            status,
            message: format!("invalid response body: {detail}"),
            kind: ErrorKind::InvalidResponse,
        }
    }

    pub(crate) fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self {
            status: 0,
            message: format!("invalid request: {detail}"),
            kind: ErrorKind::InvalidRequest,
        }
    }
}

/// Human-readable description of a failed status.
///
/// `reason` is the phrase from the status line. When absent, the standard
/// phrase for the code is used.
pub fn describe_status(status: StatusCode, reason: Option<&str>) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "invalid credentials".to_string(),
        StatusCode::FORBIDDEN => "access not authorized".to_string(),
        StatusCode::INTERNAL_SERVER_ERROR => "remote server malfunction".to_string(),
        _ => format!(
            "HTTP {}: {}",
            status.as_u16(),
            reason.or(status.canonical_reason()).unwrap_or_default()
        ),
    }
}
