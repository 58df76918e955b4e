//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address recorded)
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (x-request-id)
//!     → security::{origin, rate_limit, auth}
//!     → handlers.rs / embedder routers
//!     → response.rs (rejections as JSON)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::Rejection;
pub use server::GatewayServer;
