//! Request identities.

use std::fmt;
use std::net::IpAddr;

use axum::{body::Body, http::Request};
use serde::Serialize;

/// Identity resolved by the authentication gate and attached to request
/// extensions for resource routers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
}

/// Key partitioning admission windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    Address(IpAddr),
    Subject(String),
}

impl ClientIdentity {
    /// Prefer a principal already attached to the request, else the peer IP.
    ///
    /// The gateway's rate limiter runs before the auth gate, so inside the
    /// built-in pipeline no principal is attached yet and the result is
    /// always the peer address. A principal is only seen when an embedder
    /// attaches one in a layer outside the limiter.
    pub fn resolve(request: &Request<Body>, peer: IpAddr) -> Self {
        match request.extensions().get::<Principal>() {
            Some(principal) => ClientIdentity::Subject(principal.subject.clone()),
            None => ClientIdentity::Address(peer),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Address(ip) => write!(f, "{}", ip),
            ClientIdentity::Subject(subject) => write!(f, "sub:{}", subject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_principal() {
        let peer: IpAddr = "10.0.0.7".parse().unwrap();

        let mut request = Request::new(Body::empty());
        assert_eq!(ClientIdentity::resolve(&request, peer), ClientIdentity::Address(peer));

        request.extensions_mut().insert(Principal { subject: "alice".into() });
        assert_eq!(
            ClientIdentity::resolve(&request, peer),
            ClientIdentity::Subject("alice".into())
        );
    }
}
