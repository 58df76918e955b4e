//! Admission gateway binary.
//!
//! ```text
//!   request ──▶ origin policy ──▶ rate limiter ──▶ auth gate ──▶ routes
//!                   │                  │               │
//!                   ▼                  ▼               ▼
//!                  403                429             403
//! ```
//!
//! Configuration comes from the TOML file named by `GATEWAY_CONFIG` (if
//! any), overlaid with environment variables such as `ALLOWED_ORIGINS`. The
//! environment is read once here and nowhere else.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use admission_gateway::config::{apply_env_overrides, parse_config, validate_config, ConfigError};
use admission_gateway::lifecycle::{wait_for_signal, Shutdown};
use admission_gateway::observability::{logging, metrics};
use admission_gateway::security::StaticTokenValidator;
use admission_gateway::{GatewayConfig, GatewayServer};

const ENV_CONFIG_PATH: &str = "GATEWAY_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env: HashMap<String, String> = std::env::vars().collect();

    let mut config = match env.get(ENV_CONFIG_PATH) {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, &env)?;

    logging::init_logging(&config.observability);
    tracing::info!("admission-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.auth.tokens.is_empty() {
        tracing::warn!("No credentials configured; only bypassed routes are reachable");
    }
    let validator = Arc::new(StaticTokenValidator::from_config(&config.auth));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config, validator, Router::new())?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
