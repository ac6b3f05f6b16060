pub mod cache;
pub mod chainlist;
pub mod config;
pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod logging;
pub mod performance;
pub mod provider;
pub mod rpc;
pub mod transport;
pub mod types;

pub use error::{Result, RpcHandlerError};
pub use handler::RpcHandler;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use logging::LogLevel;
pub use types::{Endpoint, HandlerConfig, HandlerSettings, NetworkId, NetworkName, ProbeMode, ProxySettings};

// Re-export commonly used items
pub use cache::{CacheStore, EndpointCache, LatencyKey, LatencyTable, MemoryStore};
pub use config::{resolve_config, NormalizedConfig};
pub use performance::{is_valid_block_response, pick_fastest, LatencyProbe};
pub use provider::{EthRpc, FailoverOptions, FailoverProvider};
pub use rpc::HandlerRegistry;
pub use transport::{ClientFactory, HttpClientFactory, RpcClient};
