//! Rejection responses produced by the admission pipeline.
//!
//! Every stage that stops a request returns a [`Rejection`]. The body is a
//! small JSON object and never says more than the variant's message.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Why a request was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("origin not permitted")]
    OriginRejected,

    #[error("too many requests, please try again later")]
    RateLimitExceeded { retry_after: Duration },

    /// Absent, malformed, unknown and expired credentials all land here.
    #[error("authentication required")]
    Unauthenticated,

    #[error("access not authorized")]
    Unauthorized,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::OriginRejected => StatusCode::FORBIDDEN,
            Rejection::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Unauthenticated => StatusCode::FORBIDDEN,
            Rejection::Unauthorized => StatusCode::FORBIDDEN,
        }
    }

    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::OriginRejected => "origin_rejected",
            Rejection::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Rejection::Unauthenticated => "unauthenticated",
            Rejection::Unauthorized => "unauthorized",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        let mut response = (self.status(), body).into_response();

        if let Rejection::RateLimitExceeded { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
        }

        response
    }
}

/// Whole seconds, rounded up, for `Retry-After` and `RateLimit-Reset`.
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses() {
        assert_eq!(Rejection::OriginRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::Unauthenticated.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Rejection::RateLimitExceeded { retry_after: Duration::ZERO }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = Rejection::RateLimitExceeded {
            retry_after: Duration::from_millis(12_300),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_secs(60)), 60);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
