//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable)
//!
//! environment (FULLNODE_API_INFO, MINER_API_INFO)
//!     → loader.rs (endpoint_from_env)
//!     → endpoint descriptors handed to the connection builders
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the wallet runs without a config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{endpoint_from_env, load_config, ConfigError};
pub use schema::{ChainConfig, ConnectionConfig, EndpointsConfig, LogFormat, ObservabilityConfig, WalletConfig};
