//! Node-side wallet operations used by the transfer dispatcher.
//!
//! # Security
//! - Keys stay in the node's wallet; this process never holds them
//! - Only the node signs, via `MpoolPushMessage` or `WalletSignMessage`

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::blockchain::client::FullNodeApi;
use crate::blockchain::message::MsgLookup;
use crate::blockchain::transaction::TransferMessage;
use crate::blockchain::types::{Address, Cid, EncodedParams, MethodNum};
use crate::rpc::types::RpcError;

/// Node rejection text for an underfunded sender.
const NOT_ENOUGH_FUNDS: &str = "not enough funds";

/// Failure while submitting a message.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("sender {from} cannot cover the transfer: {detail}")]
    BalanceTooLow { from: Address, detail: String },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// What the dispatcher needs from a full node.
#[async_trait]
pub trait NodeServices: Send + Sync {
    /// Encode JSON parameters for `method` on the actor at `to`.
    async fn decode_typed_params_from_json(
        &self,
        to: &Address,
        method: MethodNum,
        params: Value,
    ) -> Result<EncodedParams, RpcError>;

    /// Sign and publish; returns the message CID.
    async fn send(&self, message: TransferMessage, force: bool) -> Result<Cid, SubmitError>;

    async fn wait_msg(&self, cid: &Cid, confidence: u64) -> Result<MsgLookup, RpcError>;
}

#[async_trait]
impl NodeServices for FullNodeApi {
    async fn decode_typed_params_from_json(
        &self,
        to: &Address,
        method: MethodNum,
        params: Value,
    ) -> Result<EncodedParams, RpcError> {
        let actor = self.state_get_actor(to).await?;
        self.state_encode_params(&actor.code, method, params).await
    }

    async fn send(&self, message: TransferMessage, force: bool) -> Result<Cid, SubmitError> {
        let from = match message.from.clone() {
            Some(from) => from,
            None => self.wallet_default_address().await?,
        };

        if !force {
            let balance = self.wallet_balance(&from).await?;
            let detail = match message.required_funds() {
                Some(required) if balance >= required => None,
                Some(required) => Some(format!(
                    "balance {} is below required {}",
                    balance.to_fil_string(),
                    required.to_fil_string()
                )),
                None => Some("value plus gas overflows".to_string()),
            };
            if let Some(detail) = detail {
                return Err(SubmitError::BalanceTooLow { detail, from });
            }
        }

        let nonce = message.nonce;
        let unsigned = message.into_message(from.clone());

        let pushed = match nonce {
            Some(nonce) => {
                let mut estimated = self.gas_estimate_message_gas(&unsigned).await?;
                estimated.nonce = nonce;
                let signed = self.wallet_sign_message(&from, &estimated).await?;
                self.mpool_push(&signed).await
            }
            None => self.mpool_push_message(&unsigned).await.and_then(|signed| {
                signed.cid.ok_or_else(|| RpcError::InvalidResponse {
                    method: "Filecoin.MpoolPushMessage".to_string(),
                    detail: "signed message has no CID".to_string(),
                })
            }),
        };

        pushed.map_err(|e| classify(&from, e))
    }

    async fn wait_msg(&self, cid: &Cid, confidence: u64) -> Result<MsgLookup, RpcError> {
        self.state_wait_msg(cid, confidence).await
    }
}

fn classify(from: &Address, err: RpcError) -> SubmitError {
    match err.remote_message() {
        Some(message) if message.contains(NOT_ENOUGH_FUNDS) => SubmitError::BalanceTooLow {
            from: from.clone(),
            detail: message.to_string(),
        },
        _ => SubmitError::Rpc(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::TokenAmount;
    use crate::rpc::transport::{RpcClient, RpcSession};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Fake node wallet with a fixed balance.
    struct WalletNode {
        balance: &'static str,
        push_error: Option<&'static str>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl RpcSession for WalletNode {
        async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
            self.calls.lock().unwrap().push((method.to_string(), params.clone()));
            match method {
                "Filecoin.WalletDefaultAddress" => Ok(json!("f01000")),
                "Filecoin.WalletBalance" => Ok(json!(self.balance)),
                "Filecoin.StateGetActor" => Ok(json!({
                    "Code": {"/": "bafkminer"},
                    "Head": {"/": "bafkhead"},
                    "Nonce": 0,
                    "Balance": "0"
                })),
                "Filecoin.StateEncodeParams" => Ok(json!("gVIADIoSw7g=")),
                "Filecoin.MpoolPushMessage" => match self.push_error {
                    Some(message) => Err(RpcError::Remote {
                        method: method.to_string(),
                        code: 1,
                        message: message.to_string(),
                    }),
                    None => Ok(json!({
                        "Message": params[0],
                        "Signature": {"Type": 1, "Data": "c2ln"},
                        "CID": {"/": "bafymsg"}
                    })),
                },
                "Filecoin.GasEstimateMessageGas" => {
                    let mut msg = params[0].clone();
                    msg["Nonce"] = json!(99);
                    msg["GasLimit"] = json!(1_000_000);
                    Ok(msg)
                }
                "Filecoin.WalletSignMessage" => Ok(json!({
                    "Message": params[1],
                    "Signature": {"Type": 1, "Data": "c2ln"}
                })),
                "Filecoin.MpoolPush" => Ok(json!({"/": "bafysigned"})),
                _ => Err(RpcError::Closed),
            }
        }

        fn close(&self) {}
    }

    fn node(balance: &'static str, push_error: Option<&'static str>) -> (Arc<WalletNode>, FullNodeApi) {
        let session = Arc::new(WalletNode {
            balance,
            push_error,
            calls: Mutex::new(Vec::new()),
        });
        let api = FullNodeApi::new(RpcClient::new(session.clone(), "Filecoin"));
        (session, api)
    }

    fn transfer(value: u128, nonce: Option<u64>) -> TransferMessage {
        TransferMessage {
            from: None,
            to: "f01234".parse().unwrap(),
            value: TokenAmount::from_atto(value),
            gas_premium: TokenAmount::ZERO,
            gas_fee_cap: TokenAmount::ZERO,
            gas_limit: 0,
            method: MethodNum::SEND,
            nonce,
            params: None,
        }
    }

    fn methods(session: &WalletNode) -> Vec<String> {
        session.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    #[tokio::test]
    async fn test_send_uses_default_wallet() {
        let (session, api) = node("1000", None);
        let cid = api.send(transfer(10, None), false).await.unwrap();
        assert_eq!(cid.as_str(), "bafymsg");
        assert_eq!(
            methods(&session),
            ["Filecoin.WalletDefaultAddress", "Filecoin.WalletBalance", "Filecoin.MpoolPushMessage"]
        );
        let calls = session.calls.lock().unwrap();
        assert_eq!(calls[2].1[0]["From"], "f01000");
        assert_eq!(calls[2].1[1], Value::Null);
    }

    #[tokio::test]
    async fn test_balance_precheck() {
        let (session, api) = node("5", None);
        let err = api.send(transfer(10, None), false).await.unwrap_err();
        assert!(matches!(err, SubmitError::BalanceTooLow { .. }));
        assert!(!methods(&session).contains(&"Filecoin.MpoolPushMessage".to_string()));

        let forced = api.send(transfer(10, None), true).await.unwrap();
        assert_eq!(forced.as_str(), "bafymsg");
    }

    #[tokio::test]
    async fn test_balance_precheck_counts_gas() {
        let with_gas = |gas_limit| TransferMessage {
            gas_fee_cap: TokenAmount::from_atto(100),
            gas_limit,
            ..transfer(10, None)
        };

        let (session, api) = node("1000", None);
        let err = api.send(with_gas(10), false).await.unwrap_err();
        match err {
            SubmitError::BalanceTooLow { detail, .. } => assert!(detail.contains("required")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!methods(&session).contains(&"Filecoin.MpoolPushMessage".to_string()));

        let cid = api.send(with_gas(9), false).await.unwrap();
        assert_eq!(cid.as_str(), "bafymsg");
    }

    #[tokio::test]
    async fn test_node_rejection_classified() {
        let (_, api) = node("1000", Some("mpool push: not enough funds including fees"));
        let err = api.send(transfer(10, None), true).await.unwrap_err();
        assert!(matches!(err, SubmitError::BalanceTooLow { .. }));

        let (_, api) = node("1000", Some("message nonce too low"));
        let err = api.send(transfer(10, None), true).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rpc(RpcError::Remote { .. })));
    }

    #[tokio::test]
    async fn test_explicit_nonce_signs_locally_estimated_message() {
        let (session, api) = node("1000", None);
        let cid = api.send(transfer(10, Some(7)), true).await.unwrap();
        assert_eq!(cid.as_str(), "bafysigned");
        assert_eq!(
            methods(&session),
            [
                "Filecoin.WalletDefaultAddress",
                "Filecoin.GasEstimateMessageGas",
                "Filecoin.WalletSignMessage",
                "Filecoin.MpoolPush"
            ]
        );
        let calls = session.calls.lock().unwrap();
        assert_eq!(calls[2].1[1]["Nonce"], 7);
        assert_eq!(calls[2].1[1]["GasLimit"], 1_000_000);
    }

    #[tokio::test]
    async fn test_decode_params_uses_actor_code() {
        let (session, api) = node("0", None);
        let to: Address = "f01234".parse().unwrap();
        let encoded = api
            .decode_typed_params_from_json(&to, MethodNum::WITHDRAW_BALANCE, json!({"AmountRequested": "1"}))
            .await
            .unwrap();
        assert_eq!(encoded.as_str(), "gVIADIoSw7g=");

        let calls = session.calls.lock().unwrap();
        assert_eq!(calls[1].0, "Filecoin.StateEncodeParams");
        assert_eq!(calls[1].1, vec![json!({"/": "bafkminer"}), json!(16), json!({"AmountRequested": "1"})]);
    }
}
