//! Typed node API bindings.
//!
//! # Responsibilities
//! - Map node methods onto typed Rust calls over an `RpcClient`
//! - Group methods the way the node does: common methods shared by every
//!   node kind, plus the full node or storage miner specific ones

use serde_json::{json, Value};

use crate::blockchain::message::{Actor, Message, MsgLookup, NodeVersion, SignedMessage};
use crate::blockchain::types::{Address, Cid, EncodedParams, MethodNum, TokenAmount};
use crate::rpc::transport::{arg, RpcClient};
use crate::rpc::types::RpcError;

/// Methods every node kind serves.
#[derive(Debug, Clone)]
pub struct CommonApi {
    client: RpcClient,
}

impl CommonApi {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    pub async fn version(&self) -> Result<NodeVersion, RpcError> {
        self.client.call("Version", vec![]).await
    }
}

/// Full node surface: {Common, FullNode}.
#[derive(Debug, Clone)]
pub struct FullNodeApi {
    common: CommonApi,
    client: RpcClient,
}

impl FullNodeApi {
    pub fn new(client: RpcClient) -> Self {
        Self {
            common: CommonApi::new(client.clone()),
            client,
        }
    }

    pub fn common(&self) -> &CommonApi {
        &self.common
    }

    pub async fn wallet_default_address(&self) -> Result<Address, RpcError> {
        self.client.call("WalletDefaultAddress", vec![]).await
    }

    pub async fn wallet_balance(&self, address: &Address) -> Result<TokenAmount, RpcError> {
        let method = "WalletBalance";
        self.client.call(method, vec![arg(method, address)?]).await
    }

    /// Actor state at the chain head.
    pub async fn state_get_actor(&self, address: &Address) -> Result<Actor, RpcError> {
        let method = "StateGetActor";
        self.client.call(method, vec![arg(method, address)?, json!([])]).await
    }

    /// Encode JSON method parameters for an actor code into their native form.
    pub async fn state_encode_params(
        &self,
        code: &Cid,
        method_num: MethodNum,
        params: Value,
    ) -> Result<EncodedParams, RpcError> {
        let method = "StateEncodeParams";
        self.client
            .call(method, vec![arg(method, code)?, arg(method, &method_num)?, params])
            .await
    }

    /// Let the node assign nonce and gas, sign with its wallet and publish.
    pub async fn mpool_push_message(&self, message: &Message) -> Result<SignedMessage, RpcError> {
        let method = "MpoolPushMessage";
        self.client.call(method, vec![arg(method, message)?, Value::Null]).await
    }

    pub async fn gas_estimate_message_gas(&self, message: &Message) -> Result<Message, RpcError> {
        let method = "GasEstimateMessageGas";
        self.client
            .call(method, vec![arg(method, message)?, Value::Null, json!([])])
            .await
    }

    pub async fn wallet_sign_message(&self, signer: &Address, message: &Message) -> Result<SignedMessage, RpcError> {
        let method = "WalletSignMessage";
        self.client
            .call(method, vec![arg(method, signer)?, arg(method, message)?])
            .await
    }

    pub async fn mpool_push(&self, signed: &SignedMessage) -> Result<Cid, RpcError> {
        let method = "MpoolPush";
        self.client.call(method, vec![arg(method, signed)?]).await
    }

    /// Block until `cid` is included and buried under `confidence` epochs.
    pub async fn state_wait_msg(&self, cid: &Cid, confidence: u64) -> Result<MsgLookup, RpcError> {
        let method = "StateWaitMsg";
        self.client
            .call(method, vec![arg(method, cid)?, Value::from(confidence)])
            .await
    }
}

/// Storage miner surface: {Common, StorageMiner}.
#[derive(Debug, Clone)]
pub struct StorageMinerApi {
    common: CommonApi,
    client: RpcClient,
}

impl StorageMinerApi {
    pub fn new(client: RpcClient) -> Self {
        Self {
            common: CommonApi::new(client.clone()),
            client,
        }
    }

    pub fn common(&self) -> &CommonApi {
        &self.common
    }

    /// Miner actor this storage provider operates.
    pub async fn actor_address(&self) -> Result<Address, RpcError> {
        self.client.call("ActorAddress", vec![]).await
    }

    pub async fn actor_sector_size(&self, miner: &Address) -> Result<u64, RpcError> {
        let method = "ActorSectorSize";
        self.client.call(method, vec![arg(method, miner)?]).await
    }
}
