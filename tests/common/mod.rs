//! Shared helpers for gateway integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use admission_gateway::config::{BypassRule, GatewayConfig, StaticToken};
use admission_gateway::security::{CredentialError, CredentialValidator, Principal, StaticTokenValidator};
use admission_gateway::{GatewayServer, Shutdown};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const TOKEN: &str = "abc";
pub const SUBJECT: &str = "alice";

/// Config with one allowed origin, one credential and a login bypass.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.cors.allowed_origins = vec![ALLOWED_ORIGIN.to_string()];
    config.auth.bypass = vec![BypassRule {
        path: "/users/login".into(),
        methods: vec!["POST".into()],
    }];
    config.auth.tokens = vec![StaticToken {
        token: TOKEN.into(),
        subject: SUBJECT.into(),
        expires_at: None,
    }];
    config
}

/// Stand-in for the cars/customers/users routers, counting every hit.
pub fn resource_router(hits: Arc<AtomicUsize>) -> Router {
    let login_hits = hits.clone();
    Router::new()
        .route(
            "/cars",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!([{ "id": 1, "brand": "Fiat" }]))
                }
            }),
        )
        .route(
            "/users/login",
            axum::routing::post(move |Json(body): Json<Value>| {
                let hits = login_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "token": TOKEN, "user": body["username"] }))
                }
            }),
        )
}

/// Validator wrapper that counts how often the gate consulted it.
pub struct CountingValidator {
    inner: StaticTokenValidator,
    pub calls: AtomicUsize,
}

impl CountingValidator {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            inner: StaticTokenValidator::from_config(&config.auth),
            calls: AtomicUsize::new(0),
        }
    }
}

impl CredentialValidator for CountingValidator {
    fn validate(&self, token: &str) -> Result<Principal, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(token)
    }
}

/// Run `server` on an ephemeral port. Returns its address and the shutdown
/// handle that stops it.
#[allow(dead_code)]
pub async fn spawn_gateway(server: GatewayServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
