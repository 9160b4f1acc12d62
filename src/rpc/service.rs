//! Capability sets a connection can be built for.

use crate::blockchain::client::{FullNodeApi, StorageMinerApi};
use crate::rpc::transport::RpcClient;

/// A node kind and the API surface it exposes.
pub trait ServiceKind {
    /// Human name used in logs and errors.
    const NAME: &'static str;

    type Api: Send + Sync;

    fn bind(client: RpcClient) -> Self::Api;
}

/// General-purpose node: {Common, FullNode}.
#[derive(Debug, Clone, Copy)]
pub enum FullNode {}

impl ServiceKind for FullNode {
    const NAME: &'static str = "lotus full node";
    type Api = FullNodeApi;

    fn bind(client: RpcClient) -> FullNodeApi {
        FullNodeApi::new(client)
    }
}

/// Storage provider node: {Common, StorageMiner}.
#[derive(Debug, Clone, Copy)]
pub enum StorageMiner {}

impl ServiceKind for StorageMiner {
    const NAME: &'static str = "storage miner";
    type Api = StorageMinerApi;

    fn bind(client: RpcClient) -> StorageMinerApi {
        StorageMinerApi::new(client)
    }
}
