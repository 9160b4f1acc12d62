//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Command start:
//!     CancelToken::new() → token.context() handed to the connection builder
//!
//! Signals (signals.rs):
//!     SIGINT → token.cancel() → builder aborts on its next loop check
//! ```

pub mod cancel;
pub mod signals;

pub use cancel::{CancelToken, Context};
