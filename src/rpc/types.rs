//! RPC error definitions.

use thiserror::Error;

use crate::endpoint::{EndpointError, ResolveError};

/// Failure to open a session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connect timed out after {0} seconds")]
    Timeout(u64),

    #[error("invalid RPC url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("auth token is not a valid header value")]
    InvalidToken,

    #[error("{0}")]
    Other(String),
}

/// Failure of a single call on an open session.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{method}: remote error {code}: {message}")]
    Remote { method: String, code: i64, message: String },

    #[error("{method}: encoding parameters: {source}")]
    Encode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{method}: decoding response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{method}: unexpected response: {detail}")]
    InvalidResponse { method: String, detail: String },

    #[error("connection closed")]
    Closed,
}

impl RpcError {
    /// Message text of a remote error, if this is one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            RpcError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Failure of a connection build.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("resolving endpoint: {0}")]
    Resolve(#[from] ResolveError),

    #[error("building RPC endpoint: {0}")]
    Target(#[source] TransportError),

    #[error("canceled by context")]
    Cancelled,

    #[error("couldn't connect to {service} after {attempts} attempts [{last}]")]
    Exhausted {
        service: &'static str,
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

pub type ConnectResult<T> = Result<T, ConnectError>;
