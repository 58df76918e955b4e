//! Configuration loading from disk and from an environment snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{BypassRule, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Env { key: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
pub const ENV_RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const ENV_AUTH_BYPASS: &str = "AUTH_BYPASS";
pub const ENV_AUTH_COOKIE_NAME: &str = "AUTH_COOKIE_NAME";
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse TOML text without validating it.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Overlay values from an environment snapshot onto `config`.
///
/// The snapshot is taken once by the caller; nothing here reads the process
/// environment.
pub fn apply_env_overrides(
    config: &mut GatewayConfig,
    vars: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    if let Some(origins) = vars.get(ENV_ALLOWED_ORIGINS) {
        config.cors.allowed_origins = split_list(origins).map(str::to_string).collect();
    }

    if let Some(window) = vars.get(ENV_RATE_LIMIT_WINDOW_SECS) {
        config.rate_limit.window_secs = parse_number(ENV_RATE_LIMIT_WINDOW_SECS, window)?;
    }

    if let Some(max) = vars.get(ENV_RATE_LIMIT_MAX_REQUESTS) {
        config.rate_limit.max_requests = parse_number(ENV_RATE_LIMIT_MAX_REQUESTS, max)?;
    }

    if let Some(bypass) = vars.get(ENV_AUTH_BYPASS) {
        config.auth.bypass = split_list(bypass)
            .map(parse_bypass_entry)
            .collect::<Result<_, _>>()?;
    }

    if let Some(cookie) = vars.get(ENV_AUTH_COOKIE_NAME) {
        config.auth.cookie_name = cookie.trim().to_string();
    }

    if let Some(addr) = vars.get(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr.trim().to_string();
    }

    Ok(())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key,
        reason: e.to_string(),
    })
}

/// Parse `METHOD[|METHOD...] /path`, e.g. `POST /users/login` or `GET|HEAD /status`.
fn parse_bypass_entry(entry: &str) -> Result<BypassRule, ConfigError> {
    let mut parts = entry.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(methods), Some(path), None) => Ok(BypassRule {
            path: path.to_string(),
            methods: methods.split('|').map(str::to_string).collect(),
        }),
        _ => Err(ConfigError::Env {
            key: ENV_AUTH_BYPASS,
            reason: format!("expected \"METHOD /path\", got {entry:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_toml() {
        let config = parse_config(
            r#"
            [cors]
            allowed_origins = ["http://localhost:5173"]

            [rate_limit]
            max_requests = 5

            [[auth.bypass]]
            path = "/users/login"
            methods = ["POST"]

            [[auth.tokens]]
            token = "abc"
            subject = "alice"
            "#,
        )
        .unwrap();

        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.auth.bypass[0].methods, vec!["POST"]);
        assert_eq!(config.auth.tokens[0].subject, "alice");
        assert_eq!(config.auth.tokens[0].expires_at, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            &vars(&[
                (ENV_ALLOWED_ORIGINS, "http://localhost:5173, https://app.example.com,"),
                (ENV_RATE_LIMIT_WINDOW_SECS, "30"),
                (ENV_RATE_LIMIT_MAX_REQUESTS, "10"),
                (ENV_AUTH_BYPASS, "POST /users/login, GET|HEAD /status"),
                (ENV_AUTH_COOKIE_NAME, "session"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.cors.allowed_origins,
            vec!["http://localhost:5173", "https://app.example.com"]
        );
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(
            config.auth.bypass,
            vec![
                BypassRule {
                    path: "/users/login".into(),
                    methods: vec!["POST".into()]
                },
                BypassRule {
                    path: "/status".into(),
                    methods: vec!["GET".into(), "HEAD".into()]
                },
            ]
        );
        assert_eq!(config.auth.cookie_name, "session");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, &vars(&[(ENV_RATE_LIMIT_MAX_REQUESTS, "twenty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: ENV_RATE_LIMIT_MAX_REQUESTS, .. }));

        let err = apply_env_overrides(&mut config, &vars(&[(ENV_AUTH_BYPASS, "/users/login")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: ENV_AUTH_BYPASS, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
