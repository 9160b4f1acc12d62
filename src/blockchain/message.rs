//! Message, receipt and node-info wire types.
//!
//! Field names follow the node's JSON (PascalCase).

use serde::{Deserialize, Serialize};

use crate::blockchain::types::{Address, Cid, EncodedParams, MethodNum, TokenAmount};

/// An unsigned chain message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub version: u64,
    pub to: Address,
    pub from: Address,
    pub nonce: u64,
    pub value: TokenAmount,
    pub gas_limit: i64,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
    pub method: MethodNum,
    pub params: Option<EncodedParams>,
}

/// A message with the node wallet's signature attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedMessage {
    #[serde(rename = "Message")]
    pub message: Message,
    #[serde(rename = "Signature")]
    pub signature: serde_json::Value,
    #[serde(rename = "CID", default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
}

/// Execution result of an included message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MessageReceipt {
    pub exit_code: i64,
    #[serde(rename = "Return")]
    pub return_value: Option<String>,
    pub gas_used: i64,
}

/// Result of waiting on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsgLookup {
    pub message: Cid,
    #[serde(default)]
    pub receipt: MessageReceipt,
    #[serde(default)]
    pub tip_set: serde_json::Value,
    pub height: i64,
}

/// On-chain actor state, used for its code CID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    pub code: Cid,
    pub head: Cid,
    pub nonce: u64,
    pub balance: TokenAmount,
}

/// `Version` response shared by every node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVersion {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "APIVersion")]
    pub api_version: u64,
    #[serde(rename = "BlockDelay", default)]
    pub block_delay: u64,
}
