//! Fixed-window admission rate limiting.
//!
//! Each identity gets a counter and a window start. A request outside the
//! stored window's span starts a fresh window at count zero. Boundaries are
//! not smoothed: a burst straddling two windows can admit up to twice the
//! limit across the boundary.
//!
//! Window state lives in an injected [`WindowStore`]. Updates for one
//! identity happen under that identity's shard lock, so two concurrent
//! requests can never both take the last slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::http::response::{ceil_secs, Rejection};
use crate::observability::metrics;
use crate::security::identity::ClientIdentity;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Per-identity counting bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionWindow {
    pub count: u32,
    pub started_at: Instant,
}

/// Identity → window map shared by every request in the process.
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: DashMap<ClientIdentity, AdmissionWindow>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &ClientIdentity) -> Option<AdmissionWindow> {
        self.windows.get(identity).map(|w| *w.value())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant, window: Duration) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started_at) < window);
        before.saturating_sub(self.windows.len())
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32, reset_after: Duration },
    Rejected { retry_after: Duration },
}

/// Fixed-window limiter over an injected store and clock.
pub struct FixedWindowLimiter {
    store: Arc<WindowStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
    max_requests: u32,
    enabled: bool,
}

impl FixedWindowLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<WindowStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            enabled: config.enabled,
        }
    }

    pub fn store(&self) -> &Arc<WindowStore> {
        &self.store
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count one request for `identity` and decide whether to admit it.
    pub fn check(&self, identity: &ClientIdentity) -> Admission {
        let now = self.clock.now();

        // The entry guard holds the shard write lock until it is dropped.
        let mut window = self
            .store
            .windows
            .entry(identity.clone())
            .or_insert(AdmissionWindow {
                count: 0,
                started_at: now,
            });

        let elapsed = now.saturating_duration_since(window.started_at);
        if elapsed >= self.window {
            window.count = 0;
            window.started_at = now;
        }

        let reset_after = self
            .window
            .saturating_sub(now.saturating_duration_since(window.started_at));

        if window.count >= self.max_requests {
            return Admission::Rejected {
                retry_after: reset_after,
            };
        }

        window.count += 1;
        Admission::Admitted {
            remaining: self.max_requests - window.count,
            reset_after,
        }
    }

    /// Remove elapsed windows as of the limiter's clock.
    pub fn sweep(&self) -> usize {
        let removed = self.store.purge_expired(self.clock.now(), self.window);
        metrics::record_window_count(self.store.len());
        removed
    }
}

/// Second pipeline stage.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let identity = ClientIdentity::resolve(&request, addr.ip());

    match limiter.check(&identity) {
        Admission::Admitted {
            remaining,
            reset_after,
        } => {
            metrics::record_admitted();
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limiter.max_requests()));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
            response
        }
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                client = %identity,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            let rejection = Rejection::RateLimitExceeded { retry_after };
            metrics::record_rejected(rejection.reason());
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::net::IpAddr;

    fn limiter(clock: &ManualClock) -> FixedWindowLimiter {
        FixedWindowLimiter::new(
            &RateLimitConfig::default(),
            Arc::new(WindowStore::new()),
            Arc::new(clock.clone()),
        )
    }

    fn ip(s: &str) -> ClientIdentity {
        ClientIdentity::Address(s.parse::<IpAddr>().unwrap())
    }

    #[test]
    fn test_twenty_first_request_rejected() {
        let clock = ManualClock::default();
        let limiter = limiter(&clock);
        let client = ip("10.0.0.1");

        for i in 0..20 {
            match limiter.check(&client) {
                Admission::Admitted { remaining, .. } => assert_eq!(remaining, 19 - i),
                other => panic!("request {} should be admitted, got {:?}", i + 1, other),
            }
            clock.advance(Duration::from_secs(2));
        }

        match limiter.check(&client) {
            Admission::Rejected { retry_after } => assert_eq!(retry_after, Duration::from_secs(20)),
            other => panic!("21st request should be rejected, got {:?}", other),
        }
        assert_eq!(limiter.store().get(&client).unwrap().count, 20);
    }

    #[test]
    fn test_new_window_starts_at_zero() {
        let clock = ManualClock::default();
        let limiter = limiter(&clock);
        let client = ip("10.0.0.1");

        for _ in 0..25 {
            limiter.check(&client);
        }
        assert_eq!(limiter.store().get(&client).unwrap().count, 20);

        clock.advance(Duration::from_secs(60));
        assert_eq!(
            limiter.check(&client),
            Admission::Admitted {
                remaining: 19,
                reset_after: Duration::from_secs(60)
            }
        );
        assert_eq!(limiter.store().get(&client).unwrap().count, 1);
    }

    #[test]
    fn test_boundary_burst_is_not_smoothed() {
        let clock = ManualClock::default();
        let limiter = limiter(&clock);
        let client = ip("10.0.0.1");

        clock.advance(Duration::from_secs(59));
        limiter.check(&client); // window opens here
        for _ in 0..19 {
            assert!(matches!(limiter.check(&client), Admission::Admitted { .. }));
        }

        clock.advance(Duration::from_secs(60));
        for _ in 0..20 {
            assert!(matches!(limiter.check(&client), Admission::Admitted { .. }));
        }
        assert!(matches!(limiter.check(&client), Admission::Rejected { .. }));
    }

    #[test]
    fn test_identities_are_independent() {
        let clock = ManualClock::default();
        let limiter = limiter(&clock);

        for _ in 0..20 {
            limiter.check(&ip("10.0.0.1"));
        }
        assert!(matches!(limiter.check(&ip("10.0.0.1")), Admission::Rejected { .. }));
        assert!(matches!(limiter.check(&ip("10.0.0.2")), Admission::Admitted { .. }));
        assert!(matches!(
            limiter.check(&ClientIdentity::Subject("alice".into())),
            Admission::Admitted { .. }
        ));
    }

    #[test]
    fn test_concurrent_same_identity_never_overadmits() {
        let clock = ManualClock::default();
        let limiter = Arc::new(limiter(&clock));
        let client = ip("10.0.0.1");

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                let client = client.clone();
                std::thread::spawn(move || matches!(limiter.check(&client), Admission::Admitted { .. }))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();

        assert_eq!(admitted, 20);
    }

    #[test]
    fn test_sweep_removes_elapsed_windows() {
        let clock = ManualClock::default();
        let limiter = limiter(&clock);

        limiter.check(&ip("10.0.0.1"));
        clock.advance(Duration::from_secs(30));
        limiter.check(&ip("10.0.0.2"));

        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.store().get(&ip("10.0.0.1")).is_none());
        assert!(limiter.store().get(&ip("10.0.0.2")).is_some());
    }
}
