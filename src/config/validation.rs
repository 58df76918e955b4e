//! Configuration validation.
//!
//! Semantic checks run after deserialization. Every violation is reported,
//! not just the first one.

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cors.allowed_origins must list at least one origin")]
    NoAllowedOrigins,

    #[error("allowed origin {0:?} is not an exact scheme://host[:port] origin")]
    InvalidOrigin(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimit(&'static str),

    #[error("bypass rule for {0:?} must be an absolute path")]
    RelativeBypassPath(String),

    #[error("bypass rule for {0:?} must enumerate at least one method")]
    BypassWithoutMethods(String),

    #[error("bypass rule for {path:?} names unknown method {method:?}")]
    UnknownBypassMethod { path: String, method: String },

    #[error("auth.cookie_name must not be empty")]
    EmptyCookieName,

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Check a configuration, returning every violation found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::NoAllowedOrigins);
    }
    for origin in &config.cors.allowed_origins {
        if !is_exact_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateLimit("window_secs"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimit("max_requests"));
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroRateLimit("sweep_interval_secs"));
    }

    for rule in &config.auth.bypass {
        if !rule.path.starts_with('/') {
            errors.push(ValidationError::RelativeBypassPath(rule.path.clone()));
        }
        if rule.methods.is_empty() {
            errors.push(ValidationError::BypassWithoutMethods(rule.path.clone()));
        }
        for method in &rule.methods {
            if !is_known_method(method) {
                errors.push(ValidationError::UnknownBypassMethod {
                    path: rule.path.clone(),
                    method: method.clone(),
                });
            }
        }
    }

    if config.auth.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroLimit("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroLimit("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// True when `origin` is exactly what a browser would send in `Origin`:
/// no wildcard, path, trailing slash, query or default port.
fn is_exact_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.origin().ascii_serialization() == origin
        }
        Err(_) => false,
    }
}

fn is_known_method(method: &str) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ]
    .iter()
    .any(|m| m.as_str() == method)
}
