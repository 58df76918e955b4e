//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → origin.rs (exact allow-list, CORS credential headers, preflight)
//!     → rate_limit.rs (fixed window per identity)
//!     → auth.rs (bypass list, bearer credential → Principal)
//!     → resource routers
//! ```
//!
//! # Design Decisions
//! - Fail closed: each stage rejects early and never forwards
//! - Shared state (admission windows) is injected, never global
//! - Credential validation is a trait supplied by the embedder

pub mod auth;
pub mod identity;
pub mod origin;
pub mod rate_limit;

pub use auth::{AuthGate, BypassList, CredentialError, CredentialValidator, StaticTokenValidator};
pub use identity::{ClientIdentity, Principal};
pub use origin::OriginPolicy;
pub use rate_limit::{Admission, AdmissionWindow, FixedWindowLimiter, WindowStore};
