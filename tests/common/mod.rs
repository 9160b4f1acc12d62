//! Shared utilities for integration testing.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;

/// A remote error as `(code, message)`.
pub type RemoteError = (i64, String);

/// What the mock node saw.
#[derive(Clone, Default)]
pub struct Recorded {
    pub auth: Arc<Mutex<Vec<String>>>,
    pub paths: Arc<Mutex<Vec<String>>>,
    pub calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

#[allow(dead_code)]
impl Recorded {
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn params_of(&self, method: &str) -> Option<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }
}

pub struct MockNode {
    pub addr: SocketAddr,
    pub recorded: Recorded,
}

#[allow(dead_code)]
impl MockNode {
    /// Descriptor the way Lotus prints it.
    pub fn descriptor(&self, token: &str) -> String {
        format!("{}:/ip4/127.0.0.1/tcp/{}/http", token, self.addr.port())
    }
}

/// Start a WebSocket JSON-RPC node answering every call through `handler`.
pub async fn start_mock_node<F>(handler: F) -> MockNode
where
    F: Fn(&str, &[Value]) -> Result<Value, RemoteError> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Recorded::default();
    let handler = Arc::new(handler);

    let state = recorded.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let state = state.clone();

            tokio::spawn(async move {
                let seen = state.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    if let Some(value) = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                        seen.auth.lock().unwrap().push(value.to_string());
                    }
                    seen.paths.lock().unwrap().push(req.uri().path().to_string());
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };

                while let Some(Ok(frame)) = ws.next().await {
                    let Message::Text(text) = frame else {
                        continue;
                    };
                    let call: Value = serde_json::from_str(&text).unwrap();
                    let method = call["method"].as_str().unwrap_or_default().to_string();
                    let params = call["params"].as_array().cloned().unwrap_or_default();
                    state.calls.lock().unwrap().push((method.clone(), params.clone()));

                    let reply = match handler(&method, &params) {
                        Ok(result) => json!({"jsonrpc": "2.0", "id": call["id"], "result": result}),
                        Err((code, message)) => {
                            json!({"jsonrpc": "2.0", "id": call["id"], "error": {"code": code, "message": message}})
                        }
                    };
                    if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    MockNode { addr, recorded }
}

/// Answers a full node needs to dispatch a transfer, given a wallet balance in attoFIL.
#[allow(dead_code)]
pub fn full_node(balance: &'static str) -> impl Fn(&str, &[Value]) -> Result<Value, RemoteError> + Send + Sync + 'static {
    move |method, params| match method {
        "Filecoin.Version" => Ok(json!({"Version": "1.25.2+mainnet+git.abc", "APIVersion": 66816, "BlockDelay": 30})),
        "Filecoin.WalletDefaultAddress" => Ok(json!("f01000")),
        "Filecoin.WalletBalance" => Ok(json!(balance)),
        "Filecoin.StateGetActor" => Ok(json!({
            "Code": {"/": "bafk2bzaceminer"},
            "Head": {"/": "bafy2bzacehead"},
            "Nonce": 0,
            "Balance": "0"
        })),
        "Filecoin.StateEncodeParams" => Ok(json!("gVIABWvHXi1jEAAA")),
        "Filecoin.MpoolPushMessage" => Ok(json!({
            "Message": params[0],
            "Signature": {"Type": 1, "Data": "c2lnbmF0dXJl"},
            "CID": {"/": "bafy2bzacemsg"}
        })),
        "Filecoin.StateWaitMsg" => Ok(json!({
            "Message": params[0],
            "Receipt": {"ExitCode": 0, "Return": null, "GasUsed": 488_931},
            "TipSet": [{"/": "bafy2bzacetipset"}],
            "Height": 3_141_592
        })),
        "Filecoin.ActorAddress" => Ok(json!("f01000")),
        other => Err((1, format!("method '{}' not found", other))),
    }
}

/// A local port nothing listens on.
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
