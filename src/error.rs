use crate::NetworkId;

#[derive(Debug, thiserror::Error)]
pub enum RpcHandlerError {
    #[error("Probe of {endpoint} timed out after {duration_ms}ms")]
    ProbeTimeout { endpoint: String, duration_ms: u64 },

    #[error("Probe of {endpoint} failed: {reason}")]
    ProbeTransport { endpoint: String, reason: String },

    #[error("Probe response from {endpoint} is not a valid block")]
    InvalidProbeResponse { endpoint: String },

    #[error("No latency data for network {network_id}")]
    NoLatencyData { network_id: NetworkId },

    #[error("No endpoints available for failover on network {network_id}")]
    NoEndpointsAvailable { network_id: NetworkId },

    #[error("`{method}` failed on all {attempts} failover attempts for network {network_id}: {last_error}")]
    FailoverExhausted {
        network_id: NetworkId,
        method: String,
        params: serde_json::Value,
        candidates: Vec<(String, f64)>,
        attempts: usize,
        #[source]
        last_error: Box<RpcHandlerError>,
    },

    #[error("No client has been bound for network {network_id}")]
    ClientUninitialized { network_id: NetworkId },

    #[error("No handler configuration supplied for network {network_id}")]
    ConfigMissing { network_id: NetworkId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Client for network {network_id} resolved to loopback {resolved} instead of {selected}")]
    LoopbackMismatch {
        network_id: NetworkId,
        selected: String,
        resolved: String,
    },

    #[error("JSON-RPC error {code} from {endpoint}: {message}")]
    JsonRpc {
        endpoint: String,
        code: i64,
        message: String,
    },

    #[error("HTTP {status} from {endpoint}")]
    Http { endpoint: String, status: u16 },

    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Invalid endpoint url {0}")]
    InvalidEndpoint(String),

    #[error("Unexpected result for {method}: {value}")]
    UnexpectedResponse { method: String, value: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout error: {0}")]
    TimeoutError(#[from] tokio::time::error::Elapsed),
}

impl RpcHandlerError {
    /// Errors that are raised to the caller instead of being contained by a
    /// probe cycle or a failover pass.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RpcHandlerError::NoLatencyData { .. }
                | RpcHandlerError::NoEndpointsAvailable { .. }
                | RpcHandlerError::FailoverExhausted { .. }
                | RpcHandlerError::ClientUninitialized { .. }
                | RpcHandlerError::ConfigMissing { .. }
                | RpcHandlerError::InvalidConfig(_)
                | RpcHandlerError::LoopbackMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for RpcHandlerError {
    fn from(err: serde_json::Error) -> Self {
        RpcHandlerError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcHandlerError>;
