//! Transport seams between the connection builder and the wire.
//!
//! A connector opens sessions; a session carries JSON-RPC calls until it is
//! closed. `RpcClient` adds the method namespace and typed decoding on top.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::endpoint::ResolvedAddress;
use crate::rpc::types::{RpcError, TransportError};

/// Where and how to dial.
#[derive(Clone)]
pub struct RpcEndpoint {
    url: Url,
    token: String,
}

impl RpcEndpoint {
    pub fn new(scheme: &str, address: &ResolvedAddress, path: &str, token: &str) -> Result<Self, TransportError> {
        let raw = format!("{}://{}{}", scheme, address, path);
        let url = Url::parse(&raw).map_err(|source| TransportError::InvalidUrl { url: raw, source })?;
        Ok(Self {
            url,
            token: token.to_string(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("url", &self.url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Opens authenticated sessions.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn connect(&self, endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcSession>, TransportError>;
}

/// A live request/response channel.
#[async_trait]
pub trait RpcSession: Send + Sync {
    /// Send one call with a fully qualified method name.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;

    /// Release the session. Calling it more than once is a no-op.
    fn close(&self);
}

/// Namespaced, typed calls over a session.
#[derive(Clone)]
pub struct RpcClient {
    session: Arc<dyn RpcSession>,
    namespace: Arc<str>,
}

impl RpcClient {
    pub fn new(session: Arc<dyn RpcSession>, namespace: &str) -> Self {
        Self {
            session,
            namespace: Arc::from(namespace),
        }
    }

    /// Call `<namespace>.<method>` and decode the result.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        let method = format!("{}.{}", self.namespace, method);
        let value = self.session.request(&method, params).await?;
        serde_json::from_value(value).map_err(|source| RpcError::Decode { method, source })
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient").field("namespace", &self.namespace).finish()
    }
}

/// Encode one positional argument.
pub fn arg<T: Serialize>(method: &str, value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|source| RpcError::Encode {
        method: method.to_string(),
        source,
    })
}
