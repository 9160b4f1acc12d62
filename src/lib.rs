//! Wallet client for Lotus nodes: connect over authenticated WebSocket
//! JSON-RPC and send value transfers.

pub mod blockchain;
pub mod config;
pub mod endpoint;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod rpc;

pub use blockchain::{TransferDispatcher, TransferRequest};
pub use config::schema::WalletConfig;
pub use rpc::{ConnectionBuilder, FullNode, StorageMiner};
