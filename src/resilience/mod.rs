//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection build:
//!     → retries.rs (fixed attempts, fixed pause, cancellation check per attempt)
//!     → per-attempt deadline enforced by the transport (tokio::time::timeout)
//! ```
//!
//! # Design Decisions
//! - Nodes are co-located or on the LAN and come back quickly after a
//!   restart, so the pause between attempts is constant
//! - Every external call has a deadline

pub mod retries;

pub use retries::{RetryError, RetryPolicy};
