//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the admission pipeline in front of the resource routers
//! - Wire up cross-cutting layers (request ID, tracing, timeout, body limit)
//! - Serve with peer addresses so the limiter can key on client IP
//! - Run the admission window sweeper alongside the server

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::clock::{Clock, SystemClock};
use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::http::handlers::builtin_routes;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::security::auth::{auth_middleware, AuthGate, CredentialValidator};
use crate::security::origin::{origin_middleware, OriginPolicy};
use crate::security::rate_limit::{rate_limit_middleware, FixedWindowLimiter, WindowStore};

/// The gateway: admission pipeline plus the routers it protects.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<FixedWindowLimiter>,
}

impl GatewayServer {
    /// Build the gateway on the system clock.
    ///
    /// `resources` is merged with the built-in `/status` and `/me` routes and
    /// only ever sees requests that passed every admission stage.
    pub fn new(
        config: GatewayConfig,
        validator: Arc<dyn CredentialValidator>,
        resources: Router,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, validator, resources, Arc::new(SystemClock))
    }

    /// Build the gateway with an explicit clock for the rate limiter.
    pub fn with_clock(
        config: GatewayConfig,
        validator: Arc<dyn CredentialValidator>,
        resources: Router,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let origin_policy = Arc::new(OriginPolicy::new(&config.cors));
        let limiter = Arc::new(FixedWindowLimiter::new(
            &config.rate_limit,
            Arc::new(WindowStore::new()),
            clock,
        ));
        let gate = Arc::new(AuthGate::new(&config.auth, validator));

        let router = Self::build_router(&config, resources, origin_policy, limiter.clone(), gate);
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Layers run outermost-last: origin, then rate limit, then auth.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        resources: Router,
        origin_policy: Arc<OriginPolicy>,
        limiter: Arc<FixedWindowLimiter>,
        gate: Arc<AuthGate>,
    ) -> Router {
        builtin_routes()
            .merge(resources)
            .layer(middleware::from_fn_with_state(gate, auth_middleware))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(middleware::from_fn_with_state(origin_policy, origin_middleware))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowed_origins = ?self.config.cors.allowed_origins,
            window_secs = self.config.rate_limit.window_secs,
            max_requests = self.config.rate_limit.max_requests,
            bypass_rules = self.config.auth.bypass.len(),
            "Gateway starting"
        );

        let sweeper = self.limiter.is_enabled().then(|| {
            spawn_sweeper(
                self.limiter.clone(),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            )
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

fn spawn_sweeper(limiter: Arc<FixedWindowLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(removed, remaining = limiter.store().len(), "Swept admission windows");
            }
        }
    })
}
