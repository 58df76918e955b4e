//! Authentication gate.
//!
//! Requests matching the bypass list are forwarded untouched. Everything
//! else must carry a bearer credential (header first, then cookie) that the
//! injected [`CredentialValidator`] accepts. The resolved [`Principal`] is
//! attached to request extensions.
//!
//! Absent, malformed, unknown and expired credentials produce the same
//! rejection so callers cannot tell which check failed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::{AuthConfig, BypassRule, StaticToken};
use crate::http::response::Rejection;
use crate::observability::metrics;
use crate::security::identity::Principal;

/// Why a validator refused a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("credential is not recognised")]
    Invalid,

    #[error("credential has expired")]
    Expired,

    /// The credential is genuine but may not be used here.
    #[error("credential is not permitted")]
    Denied,
}

/// Turns a bearer credential into a principal. Supplied by the embedder.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<Principal, CredentialError>;
}

/// Validator over a fixed set of configured credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: Vec<StaticToken>,
}

impl StaticTokenValidator {
    pub fn new(tokens: Vec<StaticToken>) -> Self {
        Self { tokens }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.tokens.clone())
    }
}

impl CredentialValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Result<Principal, CredentialError> {
        let entry = self
            .tokens
            .iter()
            .find(|t| t.token == token)
            .ok_or(CredentialError::Invalid)?;

        if let Some(expires_at) = entry.expires_at {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            if expires_at <= now {
                return Err(CredentialError::Expired);
            }
        }

        Ok(Principal {
            subject: entry.subject.clone(),
        })
    }
}

/// Enumerated unauthenticated endpoints. Paths match exactly.
#[derive(Debug, Clone, Default)]
pub struct BypassList {
    rules: Vec<(String, Vec<Method>)>,
}

impl BypassList {
    pub fn new(rules: &[BypassRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let methods = rule
                    .methods
                    .iter()
                    .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
                    .collect();
                (rule.path.clone(), methods)
            })
            .collect();
        Self { rules }
    }

    pub fn covers(&self, method: &Method, path: &str) -> bool {
        self.rules
            .iter()
            .any(|(p, methods)| p == path && methods.contains(method))
    }
}

/// Third pipeline stage.
pub struct AuthGate {
    bypass: BypassList,
    validator: Arc<dyn CredentialValidator>,
    cookie_name: String,
}

impl AuthGate {
    pub fn new(config: &AuthConfig, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            bypass: BypassList::new(&config.bypass),
            validator,
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// `Ok(None)` for bypassed routes, `Ok(Some(_))` for a valid credential.
    pub fn authenticate(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, Rejection> {
        if self.bypass.covers(method, path) {
            return Ok(None);
        }

        let token = extract_credential(headers, &self.cookie_name).ok_or(Rejection::Unauthenticated)?;

        match self.validator.validate(token) {
            Ok(principal) => Ok(Some(principal)),
            Err(CredentialError::Denied) => Err(Rejection::Unauthorized),
            Err(e) => {
                tracing::debug!(error = %e, "Credential refused");
                Err(Rejection::Unauthenticated)
            }
        }
    }
}

/// Bearer token from `Authorization`, else the named cookie.
///
/// The scheme name is matched case-insensitively (RFC 7235).
/// A present but malformed `Authorization` header is not rescued by the
/// cookie.
fn extract_credential<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
        let token = token.trim();
        return (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let outcome = gate.authenticate(request.method(), request.uri().path(), request.headers());

    match outcome {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = rejection.reason(),
                "Request not authenticated"
            );
            metrics::record_rejected(rejection.reason());
            rejection.into_response()
        }
    }
}
