//! Origin policy filter.
//!
//! Requests that declare an `Origin` outside the allow-list are rejected
//! before rate limiting or authentication run. Allowed origins get
//! credential-sharing headers on whatever response comes back, including
//! rejections from later stages, so browsers can read them.
//!
//! Matching is exact string equality. There is no wildcard or subdomain
//! matching. Requests without an `Origin` header (same-origin navigation,
//! non-browser clients) pass through without CORS headers, but still carry
//! `Vary: Origin` so shared caches keep the two variants apart.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::http::response::Rejection;
use crate::observability::metrics;

const PREFLIGHT_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Statically configured allow-list of origins.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    preflight_max_age: HeaderValue,
}

impl OriginPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed: config.allowed_origins.clone(),
            preflight_max_age: HeaderValue::from(config.preflight_max_age_secs),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == origin)
    }

    fn apply_credential_headers(&self, origin: &HeaderValue, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }

    fn preflight_response(&self, origin: &HeaderValue, request_headers: &HeaderMap) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();

        self.apply_credential_headers(origin, headers);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(PREFLIGHT_METHODS),
        );
        if let Some(requested) = request_headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            headers.append(
                header::VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.preflight_max_age.clone());

        response
    }
}

fn is_preflight(request: &Request<Body>) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// First pipeline stage.
pub async fn origin_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = match request.headers().get(header::ORIGIN) {
        Some(origin) => origin.clone(),
        None => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .append(header::VARY, HeaderValue::from_static("Origin"));
            return response;
        }
    };

    let allowed = origin
        .to_str()
        .map(|o| policy.is_allowed(o))
        .unwrap_or(false);

    if !allowed {
        tracing::warn!(origin = ?origin, path = %request.uri().path(), "Origin not permitted");
        let rejection = Rejection::OriginRejected;
        metrics::record_rejected(rejection.reason());
        return rejection.into_response();
    }

    if is_preflight(&request) {
        return policy.preflight_response(&origin, request.headers());
    }

    let mut response = next.run(request).await;
    policy.apply_credential_headers(&origin, response.headers_mut());
    response
}
