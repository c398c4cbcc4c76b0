//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP kernel and security stores produce:
//!     → logging.rs (structured log events: request_start, request_end, security_denied)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID and trace ID flow through every request event
//! - Metrics are cheap (atomic increments)
//! - Secrets, signatures and bodies are never logged

pub mod logging;
pub mod metrics;
