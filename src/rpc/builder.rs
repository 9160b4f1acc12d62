//! Connection factory shared by every node kind.
//!
//! # Data Flow
//! ```text
//! build(ctx)
//!     → resolver.resolve(descriptor.address)      (once; errors skip the loop)
//!     → retry.run: ctx check → connector.connect(ws://host:port/rpc/v0)
//!     → ConnectionHandle { K::bind(RpcClient), session }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::endpoint::{AddressResolver, EndpointDescriptor, EndpointError};
use crate::lifecycle::Context;
use crate::observability::metrics;
use crate::resilience::{RetryError, RetryPolicy};
use crate::rpc::service::ServiceKind;
use crate::rpc::transport::{RpcClient, RpcConnector, RpcEndpoint, RpcSession};
use crate::rpc::types::{ConnectError, ConnectResult};
use crate::rpc::websocket::WsConnector;

const WS_SCHEME: &str = "ws";

/// Builds authenticated sessions to one node of kind `K`.
pub struct ConnectionBuilder<K: ServiceKind> {
    descriptor: EndpointDescriptor,
    connector: Arc<dyn RpcConnector>,
    resolver: AddressResolver,
    retry: RetryPolicy,
    namespace: String,
    rpc_path: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ServiceKind> ConnectionBuilder<K> {
    /// Parse `endpoint` (`<token>:<multiaddr>`) and wire the WebSocket transport.
    pub fn new(endpoint: &str, config: &ConnectionConfig) -> Result<Self, EndpointError> {
        let descriptor = endpoint.parse()?;
        Ok(Self::with_parts(
            descriptor,
            Arc::new(WsConnector::new(config.connect_timeout())),
            AddressResolver::new(config.dns_timeout()),
            config,
        ))
    }

    pub fn with_parts(
        descriptor: EndpointDescriptor,
        connector: Arc<dyn RpcConnector>,
        resolver: AddressResolver,
        config: &ConnectionConfig,
    ) -> Self {
        Self {
            descriptor,
            connector,
            resolver,
            retry: RetryPolicy::from_config(config),
            namespace: config.namespace.clone(),
            rpc_path: config.rpc_path.clone(),
            _kind: PhantomData,
        }
    }

    /// Open a session, retrying failed dials at a fixed interval.
    pub async fn build(&self, ctx: &Context) -> ConnectResult<ConnectionHandle<K::Api>> {
        let resolved = self.resolver.resolve(self.descriptor.address()).await?;
        let endpoint = RpcEndpoint::new(WS_SCHEME, &resolved, &self.rpc_path, self.descriptor.token())
            .map_err(ConnectError::Target)?;
        let endpoint = &endpoint;

        tracing::debug!(service = K::NAME, target = %resolved, "Connecting");

        let outcome = self
            .retry
            .run(ctx, move |attempt| async move {
                match self.connector.connect(endpoint).await {
                    Ok(session) => {
                        metrics::record_connect_attempt(K::NAME, true);
                        Ok(session)
                    }
                    Err(e) => {
                        metrics::record_connect_attempt(K::NAME, false);
                        tracing::warn!(
                            service = K::NAME,
                            attempt,
                            error = %e,
                            "connect to remote {} error, retrying...",
                            K::NAME
                        );
                        Err(e)
                    }
                }
            })
            .await;

        match outcome {
            Ok(session) => {
                tracing::info!(service = K::NAME, target = %resolved, "Connected");
                let client = RpcClient::new(Arc::clone(&session), &self.namespace);
                Ok(ConnectionHandle::new(K::bind(client), session))
            }
            Err(RetryError::Cancelled { attempts }) => {
                tracing::warn!(service = K::NAME, attempts, "Connect canceled");
                Err(ConnectError::Cancelled)
            }
            Err(RetryError::Exhausted { attempts, last }) => Err(ConnectError::Exhausted {
                service: K::NAME,
                attempts,
                last,
            }),
        }
    }
}

impl<K: ServiceKind> fmt::Debug for ConnectionBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("service", &K::NAME)
            .field("descriptor", &self.descriptor)
            .field("retries", &self.retry.max_attempts())
            .field("retry_interval", &self.retry.interval())
            .finish()
    }
}

/// A live API surface plus the session behind it.
///
/// The session is released exactly once: by `close()` or on drop.
pub struct ConnectionHandle<A> {
    api: A,
    session: Option<Arc<dyn RpcSession>>,
}

impl<A> ConnectionHandle<A> {
    fn new(api: A, session: Arc<dyn RpcSession>) -> Self {
        Self {
            api,
            session: Some(session),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}

impl<A> Drop for ConnectionHandle<A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A> fmt::Debug for ConnectionHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("open", &self.session.is_some())
            .finish()
    }
}
