//! Transfer building, submission and confirmation.
//!
//! # Responsibilities
//! - Turn raw CLI input into a typed message
//! - Attach method parameters through the `ParamRegistry`
//! - Submit through the node wallet and wait for inclusion
//!
//! # States
//! ```text
//! Idle → Connected → MessageBuilt → [ParamsDecoded] → Submitted → Confirmed
//!   └──────────────────────── any step ───────────────────────→ Failed(reason)
//! ```

use thiserror::Error;

use crate::blockchain::message::Message;
use crate::blockchain::params::ParamRegistry;
use crate::blockchain::types::{Address, Cid, EncodedParams, MethodNum, TokenAmount, ValueError};
use crate::blockchain::wallet::{NodeServices, SubmitError};
use crate::config::ChainConfig;
use crate::lifecycle::Context;
use crate::observability::metrics;
use crate::rpc::types::{ConnectError, RpcError};
use crate::rpc::{ConnectionBuilder, FullNode};

/// Raw transfer input, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Sender; empty means the node's default wallet.
    pub from: String,
    pub to: String,
    /// FIL value, e.g. `"1.5"`.
    pub amount: String,
    /// attoFIL; unparseable values fall back to zero.
    pub gas_premium: String,
    /// attoFIL; unparseable values fall back to zero.
    pub gas_fee_cap: String,
    pub gas_limit: i64,
    pub method: u64,
    pub nonce: Option<u64>,
    /// Skip the sender balance check.
    pub force: bool,
}

impl Default for TransferRequest {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            amount: String::new(),
            gas_premium: "0".to_string(),
            gas_fee_cap: "0".to_string(),
            gas_limit: 0,
            method: 0,
            nonce: None,
            force: false,
        }
    }
}

/// A validated transfer, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMessage {
    pub from: Option<Address>,
    pub to: Address,
    pub value: TokenAmount,
    pub gas_premium: TokenAmount,
    pub gas_fee_cap: TokenAmount,
    pub gas_limit: i64,
    pub method: MethodNum,
    pub nonce: Option<u64>,
    pub params: Option<EncodedParams>,
}

impl TransferMessage {
    /// Value plus the most gas the message may burn (`GasFeeCap * GasLimit`).
    /// `None` when the sum overflows.
    pub fn required_funds(&self) -> Option<TokenAmount> {
        let gas_limit = u128::try_from(self.gas_limit.max(0)).ok()?;
        self.gas_fee_cap
            .atto()
            .checked_mul(gas_limit)
            .and_then(|gas| gas.checked_add(self.value.atto()))
            .map(TokenAmount::from_atto)
    }

    /// Chain message sent by `from`. A missing nonce is left for the node to assign.
    pub fn into_message(self, from: Address) -> Message {
        Message {
            version: 0,
            to: self.to,
            from,
            nonce: self.nonce.unwrap_or(0),
            value: self.value,
            gas_limit: self.gas_limit,
            gas_fee_cap: self.gas_fee_cap,
            gas_premium: self.gas_premium,
            method: self.method,
            params: self.params,
        }
    }
}

/// Parse and validate a request into a message.
pub fn build_message(req: &TransferRequest) -> Result<TransferMessage, SendError> {
    let to: Address = req.to.parse().map_err(SendError::InvalidTarget)?;
    let value = TokenAmount::parse_fil(&req.amount).map_err(SendError::InvalidAmount)?;
    let from = match req.from.trim() {
        "" => None,
        from => Some(from.parse::<Address>().map_err(SendError::InvalidSource)?),
    };

    Ok(TransferMessage {
        from,
        to,
        value,
        gas_premium: TokenAmount::parse_atto(&req.gas_premium).unwrap_or(TokenAmount::ZERO),
        gas_fee_cap: TokenAmount::parse_atto(&req.gas_fee_cap).unwrap_or(TokenAmount::ZERO),
        gas_limit: req.gas_limit,
        method: MethodNum(req.method),
        nonce: req.nonce,
        params: None,
    })
}

/// What went wrong, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Connect,
    InvalidInput,
    ParamEncode,
    ParamDecode,
    BalanceTooLow,
    Submit,
    Wait,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Connect => "connect",
            FailureReason::InvalidInput => "invalid_input",
            FailureReason::ParamEncode => "param_encode",
            FailureReason::ParamDecode => "param_decode",
            FailureReason::BalanceTooLow => "balance_too_low",
            FailureReason::Submit => "submit",
            FailureReason::Wait => "wait",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Connected,
    MessageBuilt,
    ParamsDecoded,
    Submitted,
    Confirmed,
    Failed(FailureReason),
}

/// Transfer failure.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connecting to full node: {0}")]
    Connect(#[from] ConnectError),

    #[error("failed to parse target address: {0}")]
    InvalidTarget(#[source] ValueError),

    #[error("failed to parse amount: {0}")]
    InvalidAmount(#[source] ValueError),

    #[error("failed to parse from address: {0}")]
    InvalidSource(#[source] ValueError),

    #[error("building params for method {method}: {source}")]
    ParamEncode {
        method: MethodNum,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode params for method {method}: {source}")]
    ParamDecode {
        method: MethodNum,
        #[source]
        source: RpcError,
    },

    #[error("balance of {from} is too low ({detail}); --force must be specified to send anyway")]
    BalanceTooLow { from: Address, detail: String },

    #[error("submitting message: {0}")]
    Submit(#[source] RpcError),

    #[error("waiting for message {cid}: {source}")]
    Wait {
        cid: Cid,
        #[source]
        source: RpcError,
    },
}

impl SendError {
    pub fn reason(&self) -> FailureReason {
        match self {
            SendError::Connect(_) => FailureReason::Connect,
            SendError::InvalidTarget(_) | SendError::InvalidAmount(_) | SendError::InvalidSource(_) => {
                FailureReason::InvalidInput
            }
            SendError::ParamEncode { .. } => FailureReason::ParamEncode,
            SendError::ParamDecode { .. } => FailureReason::ParamDecode,
            SendError::BalanceTooLow { .. } => FailureReason::BalanceTooLow,
            SendError::Submit(_) => FailureReason::Submit,
            SendError::Wait { .. } => FailureReason::Wait,
        }
    }
}

impl From<SubmitError> for SendError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::BalanceTooLow { from, detail } => SendError::BalanceTooLow { from, detail },
            SubmitError::Rpc(e) => SendError::Submit(e),
        }
    }
}

/// Inclusion result of a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub message: Cid,
    pub height: i64,
    pub exit_code: i64,
}

struct Tracker {
    state: DispatchState,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: DispatchState::Idle,
        }
    }

    fn advance(&mut self, next: DispatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "Dispatch state");
        self.state = next;
    }

    fn fail(&mut self, err: SendError) -> SendError {
        let reason = err.reason();
        self.advance(DispatchState::Failed(reason));
        metrics::record_transfer(reason.as_str());
        err
    }
}

/// Connects, sends one transfer and waits for it.
#[derive(Debug)]
pub struct TransferDispatcher {
    builder: ConnectionBuilder<FullNode>,
    params: ParamRegistry,
    message_confidence: u64,
}

impl TransferDispatcher {
    pub fn new(builder: ConnectionBuilder<FullNode>, chain: &ChainConfig) -> Self {
        Self::with_params(builder, ParamRegistry::default(), chain.message_confidence)
    }

    pub fn with_params(builder: ConnectionBuilder<FullNode>, params: ParamRegistry, message_confidence: u64) -> Self {
        Self {
            builder,
            params,
            message_confidence,
        }
    }

    /// `ctx` governs connecting only; once connected the transfer runs to completion.
    pub async fn send(&self, ctx: &Context, req: &TransferRequest) -> Result<Receipt, SendError> {
        let mut tracker = Tracker::new();
        let handle = match self.builder.build(ctx).await {
            Ok(handle) => handle,
            Err(e) => return Err(tracker.fail(SendError::Connect(e))),
        };
        tracker.advance(DispatchState::Connected);

        let result = drive(handle.api(), &self.params, req, self.message_confidence, &mut tracker).await;
        handle.close();
        result
    }
}

/// Run a transfer against an already connected node.
pub async fn execute<S>(
    services: &S,
    params: &ParamRegistry,
    req: &TransferRequest,
    confidence: u64,
) -> Result<Receipt, SendError>
where
    S: NodeServices + ?Sized,
{
    let mut tracker = Tracker::new();
    tracker.advance(DispatchState::Connected);
    drive(services, params, req, confidence, &mut tracker).await
}

async fn drive<S>(
    services: &S,
    params: &ParamRegistry,
    req: &TransferRequest,
    confidence: u64,
    tracker: &mut Tracker,
) -> Result<Receipt, SendError>
where
    S: NodeServices + ?Sized,
{
    match steps(services, params, req, confidence, tracker).await {
        Ok(receipt) => {
            tracker.advance(DispatchState::Confirmed);
            metrics::record_transfer("confirmed");
            Ok(receipt)
        }
        Err(e) => Err(tracker.fail(e)),
    }
}

async fn steps<S>(
    services: &S,
    params: &ParamRegistry,
    req: &TransferRequest,
    confidence: u64,
    tracker: &mut Tracker,
) -> Result<Receipt, SendError>
where
    S: NodeServices + ?Sized,
{
    let mut msg = build_message(req)?;
    tracker.advance(DispatchState::MessageBuilt);

    if let Some(strategy) = params.get(msg.method) {
        let method = msg.method;
        let json = strategy
            .build(msg.value)
            .map_err(|source| SendError::ParamEncode { method, source })?;
        let encoded = services
            .decode_typed_params_from_json(&msg.to, method, json)
            .await
            .map_err(|source| SendError::ParamDecode { method, source })?;
        msg.params = Some(encoded);
        tracker.advance(DispatchState::ParamsDecoded);
    }

    let to = msg.to.clone();
    let value = msg.value;
    let cid = services.send(msg, req.force).await?;
    tracker.advance(DispatchState::Submitted);
    tracing::info!(cid = %cid, to = %to, value = %value.to_fil_string(), "Message submitted");

    let lookup = services
        .wait_msg(&cid, confidence)
        .await
        .map_err(|source| SendError::Wait { cid: cid.clone(), source })?;

    let receipt = Receipt {
        message: lookup.message,
        height: lookup.height,
        exit_code: lookup.receipt.exit_code,
    };
    if receipt.exit_code != 0 {
        tracing::warn!(cid = %receipt.message, exit_code = receipt.exit_code, "Message executed with non-zero exit code");
    } else {
        tracing::info!(cid = %receipt.message, height = receipt.height, "Message confirmed");
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::message::{MessageReceipt, MsgLookup};
    use crate::config::ConnectionConfig;
    use crate::endpoint::AddressResolver;
    use crate::rpc::transport::{RpcConnector, RpcEndpoint, RpcSession};
    use crate::rpc::types::TransportError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockNode {
        decodes: Mutex<Vec<(Address, MethodNum, Value)>>,
        sent: Mutex<Vec<(TransferMessage, bool)>>,
        underfunded: bool,
        reject: Option<&'static str>,
        exit_code: i64,
    }

    #[async_trait]
    impl NodeServices for MockNode {
        async fn decode_typed_params_from_json(
            &self,
            to: &Address,
            method: MethodNum,
            params: Value,
        ) -> Result<EncodedParams, RpcError> {
            self.decodes.lock().unwrap().push((to.clone(), method, params));
            Ok(EncodedParams::new("gVIADIoSw7g="))
        }

        async fn send(&self, message: TransferMessage, force: bool) -> Result<Cid, SubmitError> {
            let from = message.from.clone().unwrap_or_else(|| "f01000".parse().unwrap());
            self.sent.lock().unwrap().push((message, force));
            if self.underfunded && !force {
                return Err(SubmitError::BalanceTooLow {
                    from,
                    detail: "balance 0 FIL is below value 1 FIL".to_string(),
                });
            }
            if let Some(message) = self.reject {
                return Err(SubmitError::Rpc(RpcError::Remote {
                    method: "Filecoin.MpoolPushMessage".to_string(),
                    code: 1,
                    message: message.to_string(),
                }));
            }
            Ok(Cid::new("bafymsg"))
        }

        async fn wait_msg(&self, cid: &Cid, confidence: u64) -> Result<MsgLookup, RpcError> {
            assert_eq!(confidence, 5);
            Ok(MsgLookup {
                message: cid.clone(),
                receipt: MessageReceipt {
                    exit_code: self.exit_code,
                    ..MessageReceipt::default()
                },
                tip_set: Value::Null,
                height: 42,
            })
        }
    }

    fn request(to: &str, amount: &str, method: u64) -> TransferRequest {
        TransferRequest {
            to: to.to_string(),
            amount: amount.to_string(),
            method,
            ..TransferRequest::default()
        }
    }

    #[tokio::test]
    async fn test_withdraw_balance_params_are_decoded() {
        let node = MockNode::default();
        let receipt = execute(&node, &ParamRegistry::default(), &request("f01234", "100", 16), 5)
            .await
            .unwrap();
        assert_eq!(receipt.height, 42);

        let decodes = node.decodes.lock().unwrap();
        assert_eq!(decodes.len(), 1);
        assert_eq!(decodes[0].1, MethodNum::WITHDRAW_BALANCE);
        assert_eq!(decodes[0].2, json!({"AmountRequested": "100000000000000000000"}));

        let sent = node.sent.lock().unwrap();
        assert_eq!(sent[0].0.params, Some(EncodedParams::new("gVIADIoSw7g=")));
    }

    #[tokio::test]
    async fn test_plain_send_skips_param_decode() {
        let node = MockNode::default();
        let receipt = execute(&node, &ParamRegistry::default(), &request("f01234", "1.5", 0), 5)
            .await
            .unwrap();
        assert_eq!(receipt.message, Cid::new("bafymsg"));

        assert!(node.decodes.lock().unwrap().is_empty());
        let sent = node.sent.lock().unwrap();
        let (msg, force) = &sent[0];
        assert_eq!(msg.params, None);
        assert_eq!(msg.value.atto(), 1_500_000_000_000_000_000);
        assert_eq!(msg.from, None);
        assert!(!force);
    }

    #[tokio::test]
    async fn test_balance_too_low_differs_from_submit_error() {
        let node = MockNode {
            underfunded: true,
            ..MockNode::default()
        };
        let low = execute(&node, &ParamRegistry::default(), &request("f01234", "1", 0), 5)
            .await
            .unwrap_err();
        assert_eq!(low.reason(), FailureReason::BalanceTooLow);
        assert!(low.to_string().contains("--force"));

        let node = MockNode {
            reject: Some("message nonce too low"),
            ..MockNode::default()
        };
        let generic = execute(&node, &ParamRegistry::default(), &request("f01234", "1", 0), 5)
            .await
            .unwrap_err();
        assert_eq!(generic.reason(), FailureReason::Submit);
        assert_ne!(low.to_string(), generic.to_string());
        assert!(!generic.to_string().contains("--force"));
    }

    #[tokio::test]
    async fn test_force_is_forwarded() {
        let node = MockNode {
            underfunded: true,
            ..MockNode::default()
        };
        let req = TransferRequest {
            force: true,
            ..request("f01234", "1", 0)
        };
        assert!(execute(&node, &ParamRegistry::default(), &req, 5).await.is_ok());
        assert!(node.sent.lock().unwrap()[0].1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_code_is_returned() {
        let node = MockNode {
            exit_code: 16,
            ..MockNode::default()
        };
        let receipt = execute(&node, &ParamRegistry::default(), &request("f01234", "1", 0), 5)
            .await
            .unwrap();
        assert_eq!(receipt.exit_code, 16);
    }

    #[test]
    fn test_build_message_validation() {
        let err = build_message(&request("addr1", "1", 0)).unwrap_err();
        assert!(matches!(err, SendError::InvalidTarget(_)));

        let err = build_message(&request("f01234", "lots", 0)).unwrap_err();
        assert!(matches!(err, SendError::InvalidAmount(_)));

        let err = build_message(&TransferRequest {
            from: "nope".to_string(),
            ..request("f01234", "1", 0)
        })
        .unwrap_err();
        assert!(matches!(err, SendError::InvalidSource(_)));
    }

    #[test]
    fn test_gas_values_fall_back_to_zero() {
        let msg = build_message(&TransferRequest {
            gas_premium: "not-a-number".to_string(),
            gas_fee_cap: "".to_string(),
            gas_limit: 250_000,
            nonce: Some(3),
            ..request("f01234", "1", 0)
        })
        .unwrap();
        assert_eq!(msg.gas_premium, TokenAmount::ZERO);
        assert_eq!(msg.gas_fee_cap, TokenAmount::ZERO);
        assert_eq!(msg.gas_limit, 250_000);

        let chain = msg.into_message("f01000".parse().unwrap());
        assert_eq!(chain.nonce, 3);
        assert_eq!(chain.from.to_string(), "f01000");
    }

    #[tokio::test]
    async fn test_tracker_ends_in_failed_state() {
        let node = MockNode::default();
        let mut tracker = Tracker::new();
        tracker.advance(DispatchState::Connected);
        let result = drive(&node, &ParamRegistry::default(), &request("bad", "1", 0), 5, &mut tracker).await;
        assert!(result.is_err());
        assert_eq!(tracker.state, DispatchState::Failed(FailureReason::InvalidInput));

        let mut tracker = Tracker::new();
        drive(&node, &ParamRegistry::default(), &request("f01234", "1", 16), 5, &mut tracker)
            .await
            .unwrap();
        assert_eq!(tracker.state, DispatchState::Confirmed);
    }
    /// Empty wallet that counts how often its session is released.
    #[derive(Default)]
    struct EmptyWalletSession {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl RpcSession for EmptyWalletSession {
        async fn request(&self, method: &str, _params: Vec<Value>) -> Result<Value, RpcError> {
            match method {
                "Filecoin.WalletDefaultAddress" => Ok(json!("f01000")),
                "Filecoin.WalletBalance" => Ok(json!("0")),
                _ => Err(RpcError::Closed),
            }
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SharedSessionConnector {
        session: Arc<EmptyWalletSession>,
    }

    #[async_trait]
    impl RpcConnector for SharedSessionConnector {
        async fn connect(&self, _endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcSession>, TransportError> {
            Ok(self.session.clone())
        }
    }

    #[tokio::test]
    async fn test_dispatcher_releases_connection_on_failure() {
        let session = Arc::new(EmptyWalletSession::default());
        let config = ConnectionConfig::default();
        let builder = ConnectionBuilder::with_parts(
            "tok:/ip4/127.0.0.1/tcp/1234".parse().unwrap(),
            Arc::new(SharedSessionConnector {
                session: session.clone(),
            }),
            AddressResolver::new(config.dns_timeout()),
            &config,
        );
        let dispatcher = TransferDispatcher::new(builder, &ChainConfig::default());
        let ctx = Context::background();

        let err = dispatcher.send(&ctx, &request("addr1", "1", 0)).await.unwrap_err();
        assert_eq!(err.reason(), FailureReason::InvalidInput);
        assert_eq!(session.closes.load(Ordering::SeqCst), 1);

        let err = dispatcher.send(&ctx, &request("f01234", "1", 0)).await.unwrap_err();
        assert_eq!(err.reason(), FailureReason::BalanceTooLow);
        assert_eq!(session.closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_required_funds_include_gas() {
        let msg = TransferMessage {
            from: None,
            to: "f01234".parse().unwrap(),
            value: TokenAmount::from_atto(10),
            gas_premium: TokenAmount::ZERO,
            gas_fee_cap: TokenAmount::from_atto(100),
            gas_limit: 10,
            method: MethodNum::SEND,
            nonce: None,
            params: None,
        };
        assert_eq!(msg.required_funds(), Some(TokenAmount::from_atto(1010)));

        let negative = TransferMessage { gas_limit: -5, ..msg.clone() };
        assert_eq!(negative.required_funds(), Some(TokenAmount::from_atto(10)));

        let overflow = TransferMessage {
            gas_fee_cap: TokenAmount::from_atto(u128::MAX),
            gas_limit: 2,
            ..msg
        };
        assert_eq!(overflow.required_funds(), None);
    }
}
