use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::{JsonRpcRequest, JsonRpcResponse, Result, RpcHandlerError};

/// A client handle bound to a single endpoint.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// The address this client actually sends requests to.
    fn endpoint(&self) -> &str;

    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse<Value>>;
}

/// Opens client handles for endpoints. Handles are cheap and may be ephemeral.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcClient>>;
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    endpoint: String,
    url: Url,
    call_timeout: Duration,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(endpoint: &str, call_timeout: Duration, client: reqwest::Client) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|_| RpcHandlerError::InvalidEndpoint(endpoint.to_string()))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            url,
            call_timeout,
            client,
        })
    }
}

#[async_trait]
impl RpcClient for HttpClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse<Value>> {
        // `.json()` sets `Content-Type: application/json`
        let response = tokio::time::timeout(
            self.call_timeout,
            self.client.post(self.url.clone()).json(request).send(),
        )
        .await
        .map_err(|_| RpcHandlerError::Timeout {
            duration_ms: self.call_timeout.as_millis() as u64,
        })??;

        if response.status().is_success() {
            let json_response = response.json().await?;
            Ok(json_response)
        } else {
            Err(RpcHandlerError::Http {
                endpoint: self.endpoint.clone(),
                status: response.status().as_u16(),
            })
        }
    }
}

/// Shares one `reqwest` connection pool between every handle it opens.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    client: reqwest::Client,
    call_timeout: Duration,
}

impl HttpClientFactory {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            call_timeout,
        }
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_millis(10000))
    }
}

impl ClientFactory for HttpClientFactory {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcClient>> {
        Ok(Arc::new(HttpClient::new(endpoint, self.call_timeout, self.client.clone())?))
    }
}

/// True when the url's host is `localhost` or a loopback address.
pub fn is_loopback(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint) else {
        return false;
    };

    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
