//! Endpoint error definitions.

use thiserror::Error;

/// Malformed endpoint descriptor. Always a configuration problem.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("endpoint descriptor must look like <token>:<multiaddr>")]
    MissingSeparator,

    #[error("endpoint descriptor has an empty token")]
    EmptyToken,

    #[error("endpoint descriptor has an empty address")]
    EmptyAddress,

    #[error("invalid multiaddr '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: multiaddr::Error,
    },
}

/// Failure to turn a multiaddr into a dialable `host:port`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolving dns {host}: timed out after {timeout_ms}ms")]
    DnsTimeout { host: String, timeout_ms: u128 },

    #[error("resolving dns {host}: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resolving dns {host}: no usable addresses")]
    NoCandidates { host: String },

    #[error("getting ip from maddr {0}: no ip in multiaddr")]
    MissingIp(String),

    #[error("getting port from maddr {0}: no tcp port in multiaddr")]
    MissingPort(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
