//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Admission stages produce:
//!     → logging.rs (tracing events: rejections at warn, sweeps at debug)
//!     → metrics.rs (admitted / rejected counters, window gauge)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
