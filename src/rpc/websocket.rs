//! JSON-RPC 2.0 over a WebSocket.
//!
//! # Data Flow
//! ```text
//! request() ──▶ pending[id] = oneshot ──▶ sink: {"jsonrpc","id","method","params"}
//!                                                        │
//! reader task ◀── stream: {"id","result"|"error"} ◀──────┘
//!     └─▶ pending.remove(id).send(result)
//! ```
//!
//! # Design Decisions
//! - One reader task per session, aborted by `close()`
//! - Frames without a known id (notifications) are ignored
//! - Pending callers see `RpcError::Closed` when the socket goes away

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::rpc::transport::{RpcConnector, RpcEndpoint, RpcSession};
use crate::rpc::types::{RpcError, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>>>;

/// Dials WebSocket JSON-RPC sessions.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl RpcConnector for WsConnector {
    async fn connect(&self, endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcSession>, TransportError> {
        let mut request = endpoint.url().as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&endpoint.authorization()).map_err(|_| TransportError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (stream, _response) = timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout.as_secs()))??;

        tracing::debug!(url = %endpoint.url(), "WebSocket session opened");
        Ok(Arc::new(WsSession::spawn(stream)))
    }
}

/// One open WebSocket with its response router.
pub struct WsSession {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    next_id: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl WsSession {
    fn spawn(stream: WsStream) -> Self {
        let (sink, stream) = stream.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&pending), Arc::clone(&closed)));

        Self {
            sink: tokio::sync::Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
            reader: Mutex::new(Some(reader)),
            closed,
        }
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }
}

#[async_trait]
impl RpcSession for WsSession {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| RpcError::Closed)?
            .insert(id, tx);
        // The reader marks the session closed before dropping waiters, so a
        // request registered after that point is caught here.
        if self.closed.load(Ordering::SeqCst) {
            self.forget(id);
            return Err(RpcError::Closed);
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::trace!(id, method, "RPC request");
        let sent = self.sink.lock().await.send(Message::Text(body.to_string().into())).await;
        if let Err(e) = sent {
            self.forget(id);
            return Err(RpcError::Transport(e.to_string()));
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(RpcError::Remote { code, message, .. })) => Err(RpcError::Remote {
                method: method.to_string(),
                code,
                message,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RpcError::Closed),
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(handle) = reader.take() {
                handle.abort();
            }
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
        tracing::debug!("WebSocket session closed");
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Deserialize)]
struct ResponseFrame {
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

async fn read_loop(mut stream: SplitStream<WsStream>, pending: Pending, closed: Arc<AtomicBool>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => route_response(&text, &pending),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    // Dropping the senders wakes every waiter with `Closed`.
    closed.store(true, Ordering::SeqCst);
    if let Ok(mut pending) = pending.lock() {
        pending.clear();
    }
}

fn route_response(text: &str, pending: &Pending) {
    let frame: ResponseFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring non-response frame");
            return;
        }
    };
    // Server-initiated requests carry a method; only responses are routed.
    if frame.method.is_some() {
        return;
    }
    let Some(id) = frame.id else {
        // A null id means the node could not read the request it answers.
        if let Some(err) = frame.error {
            tracing::warn!(code = err.code, message = %err.message, "Error response without request id, failing pending calls");
            let waiters: Vec<_> = match pending.lock() {
                Ok(mut p) => p.drain().map(|(_, waiter)| waiter).collect(),
                Err(_) => Vec::new(),
            };
            for waiter in waiters {
                let _ = waiter.send(Err(RpcError::Remote {
                    method: String::new(),
                    code: err.code,
                    message: err.message.clone(),
                }));
            }
        }
        return;
    };
    let Some(waiter) = pending.lock().ok().and_then(|mut p| p.remove(&id)) else {
        tracing::debug!(id, "Response for unknown request id");
        return;
    };

    let result = match frame.error {
        Some(err) => Err(RpcError::Remote {
            method: String::new(),
            code: err.code,
            message: err.message,
        }),
        None => Ok(frame.result.unwrap_or(Value::Null)),
    };
    let _ = waiter.send(result);
}
