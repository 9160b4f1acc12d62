//! Configuration validation.
//!
//! Serde handles the syntax; this module checks value ranges and returns
//! every problem found, not just the first.

use std::fmt;

use crate::config::schema::WalletConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.fullnode_env.trim().is_empty() {
        errors.push(ValidationError::new("endpoints.fullnode_env", "must not be empty"));
    }
    if config.endpoints.miner_env.trim().is_empty() {
        errors.push(ValidationError::new("endpoints.miner_env", "must not be empty"));
    }

    let conn = &config.connection;
    if conn.retries == 0 {
        errors.push(ValidationError::new("connection.retries", "must be greater than 0"));
    }
    if conn.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "connection.connect_timeout_secs",
            "must be greater than 0",
        ));
    }
    if conn.dns_timeout_ms == 0 {
        errors.push(ValidationError::new("connection.dns_timeout_ms", "must be greater than 0"));
    }
    if conn.namespace.is_empty() {
        errors.push(ValidationError::new("connection.namespace", "must not be empty"));
    }
    if !conn.rpc_path.starts_with('/') {
        errors.push(ValidationError::new("connection.rpc_path", "must start with '/'"));
    }

    if config.observability.log_level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
