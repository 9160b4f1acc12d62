//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//! ```
//!
//! # Design Decisions
//! - Bearer tokens never reach a log line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
