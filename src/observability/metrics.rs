//! Metrics collection.
//!
//! # Metrics
//! - `wallet_connect_attempts_total` (counter): by service, outcome
//! - `wallet_transfers_total` (counter): by outcome
//!
//! Without an installed recorder these are no-ops.

use metrics::counter;

/// Record one connection attempt against a node service.
pub fn record_connect_attempt(service: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("wallet_connect_attempts_total", "service" => service, "outcome" => outcome).increment(1);
}

/// Record the final outcome of a transfer dispatch.
pub fn record_transfer(outcome: &'static str) {
    counter!("wallet_transfers_total", "outcome" => outcome).increment(1);
}
