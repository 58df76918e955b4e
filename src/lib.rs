//! Admission gateway library.
//!
//! Origin policy, fixed-window rate limiting and an authentication gate in
//! front of embedder-supplied axum routers.

pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
