#![allow(dead_code)]

use std::{collections::HashMap, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rpc_failover::{
    transport::{ClientFactory, RpcClient},
    JsonRpcRequest, JsonRpcResponse, Result, RpcHandlerError,
};
use serde_json::{json, Value};

// Network id absent from the static chainlist so tests stay hermetic.
pub const TEST_NETWORK_ID: u64 = 424242;

pub fn block_result() -> Value {
    json!({
        "number": "0x10",
        "timestamp": "0x5f5",
        "hash": format!("0x{}", "a".repeat(64)),
    })
}

pub fn block_response() -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": block_result() })
}

#[derive(Debug, Clone)]
pub enum Reply {
    /// A valid block for any method.
    Block,
    /// `Block` after a delay.
    Slow(Duration),
    /// A block with a malformed hash.
    Invalid,
    /// A fixed result for any method.
    Value(Value),
    /// A JSON-RPC error object.
    RpcError,
    /// Transport failure.
    Fail,
}

#[derive(Default)]
struct Inner {
    replies: Mutex<HashMap<String, Reply>>,
    resolved: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, String)>>,
}

/// Scripted in-memory transport. Endpoints without a script fail.
#[derive(Clone, Default)]
pub struct FakeFactory {
    inner: Arc<Inner>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, endpoint: &str, reply: Reply) -> &Self {
        self.inner.replies.lock().insert(endpoint.to_string(), reply);
        self
    }

    /// Makes clients for `endpoint` report `resolved` as their address.
    pub fn resolve(&self, endpoint: &str, resolved: &str) -> &Self {
        self.inner
            .resolved
            .lock()
            .insert(endpoint.to_string(), resolved.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.inner.calls.lock().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|(url, _)| url == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }
}

impl ClientFactory for FakeFactory {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcClient>> {
        let resolved = self
            .inner
            .resolved
            .lock()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| endpoint.to_string());

        Ok(Arc::new(FakeClient {
            key: endpoint.to_string(),
            resolved,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct FakeClient {
    key: String,
    resolved: String,
    inner: Arc<Inner>,
}

#[async_trait]
impl RpcClient for FakeClient {
    fn endpoint(&self) -> &str {
        &self.resolved
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse<Value>> {
        self.inner
            .calls
            .lock()
            .push((self.key.clone(), request.method.clone()));

        let reply = self
            .inner
            .replies
            .lock()
            .get(&self.key)
            .cloned()
            .unwrap_or(Reply::Fail);

        let body = match reply {
            Reply::Block => block_response(),
            Reply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                block_response()
            }
            Reply::Invalid => json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "number": "0x10", "timestamp": "0x5f5", "hash": "0xabc" }
            }),
            Reply::Value(value) => json!({ "jsonrpc": "2.0", "id": request.id, "result": value }),
            Reply::RpcError => json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "error": { "code": -32000, "message": "execution reverted" }
            }),
            Reply::Fail => {
                return Err(RpcHandlerError::Http {
                    endpoint: self.key.clone(),
                    status: 503,
                });
            }
        };

        Ok(serde_json::from_value(body)?)
    }
}

/// Formatted `tracing` output of the current thread, for asserting on logs.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Installs a subscriber writing into the returned buffer until the guard
    /// is dropped. `#[tokio::test]` runs on one thread, so spawned tasks log
    /// here too.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Lines carrying the `fatal = true` field.
    pub fn fatal_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("fatal=true"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
