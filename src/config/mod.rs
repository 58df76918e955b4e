//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml (optional)          process environment (snapshot, once)
//!     → loader.rs (parse)              → loader.rs (apply_env_overrides)
//!                 \                    /
//!                  → validation.rs (semantic checks, all errors)
//!                  → GatewayConfig (validated, immutable)
//!                  → handed to each component's constructor
//! ```
//!
//! # Design Decisions
//! - Components never read the environment; they receive their section
//! - Mandatory values (the origin allow-list) have no permissive default
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BypassRule, CorsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, StaticToken,
};
pub use validation::{validate_config, ValidationError};
