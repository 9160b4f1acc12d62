//! Node RPC subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionBuilder<K>::build(ctx)
//!     → endpoint resolver → RetryPolicy
//!     → RpcConnector::connect (websocket.rs: bearer-authenticated upgrade)
//!     → ConnectionHandle<K::Api>   (FullNodeApi | StorageMinerApi)
//!
//! api.method(..) → RpcClient::call("<namespace>.<Method>") → RpcSession::request
//! ```
//!
//! # Design Decisions
//! - One generic builder; the node kind only picks the bound API surface
//! - Transport sits behind traits so the builder is testable without sockets

pub mod builder;
pub mod service;
pub mod transport;
pub mod types;
pub mod websocket;

pub use builder::{ConnectionBuilder, ConnectionHandle};
pub use service::{FullNode, ServiceKind, StorageMiner};
pub use transport::{RpcClient, RpcConnector, RpcEndpoint, RpcSession};
pub use types::{ConnectError, ConnectResult, RpcError, TransportError};
pub use websocket::WsConnector;
