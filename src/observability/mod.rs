//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - A request id is attached to each forwarding span for correlation only;
//!   it is never added to the forwarded headers
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
