//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the wallet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Where the node endpoint descriptors come from.
    pub endpoints: EndpointsConfig,

    /// Connection building (retries, timeouts, RPC path).
    pub connection: ConnectionConfig,

    /// Chain parameters used during dispatch.
    pub chain: ChainConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Environment variables carrying `<token>:<multiaddr>` descriptors.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Variable holding the full node descriptor.
    pub fullnode_env: String,

    /// Variable holding the storage miner descriptor.
    pub miner_env: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            fullnode_env: "FULLNODE_API_INFO".to_string(),
            miner_env: "MINER_API_INFO".to_string(),
        }
    }
}

/// Connection builder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum number of connection attempts per build.
    pub retries: u32,

    /// Fixed pause between two failed attempts, in seconds.
    pub retry_interval_secs: u64,

    /// WebSocket handshake timeout per attempt, in seconds.
    pub connect_timeout_secs: u64,

    /// Hostname resolution timeout, in milliseconds.
    pub dns_timeout_ms: u64,

    /// JSON-RPC method namespace (`<namespace>.<Method>`).
    pub namespace: String,

    /// HTTP path of the RPC endpoint.
    pub rpc_path: String,
}

impl ConnectionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_interval_secs: 10,
            connect_timeout_secs: 30,
            dns_timeout_ms: 1000,
            namespace: "Filecoin".to_string(),
            rpc_path: "/rpc/v0".to_string(),
        }
    }
}

/// Chain parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Number of epochs a message must be buried under before it is
    /// reported as confirmed.
    pub message_confidence: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            message_confidence: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
