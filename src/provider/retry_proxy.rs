use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde_json::{json, Value};

use crate::{
    cache::EndpointCache,
    logging::HandlerLogger,
    transport::{ClientFactory, RpcClient},
    JsonRpcRequest, NetworkId, ProxySettings, Result, RpcHandlerError,
};

#[derive(Debug, Clone)]
pub struct FailoverOptions {
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// Skip failover entirely; the bound client's error is returned as is.
    pub disabled: bool,
    pub max_duration: Option<Duration>,
}

impl FailoverOptions {
    /// Upper bound on the time spent sleeping between attempts over
    /// `candidates` endpoints, ignoring the attempts themselves.
    pub fn worst_case_delay(&self, candidates: usize) -> Duration {
        self.retry_delay
            .saturating_mul(self.retry_count)
            .saturating_mul(u32::try_from(candidates).unwrap_or(u32::MAX))
    }
}

impl From<&ProxySettings> for FailoverOptions {
    fn from(settings: &ProxySettings) -> Self {
        Self {
            retry_count: settings.retry_count,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            disabled: settings.disabled,
            max_duration: settings.max_duration_ms.map(Duration::from_millis),
        }
    }
}

impl Default for FailoverOptions {
    fn default() -> Self {
        Self::from(&ProxySettings::default())
    }
}

/// Called with the provider whose failover ran out of candidates.
pub type ExhaustionHook = Arc<dyn Fn(&FailoverProvider) + Send + Sync>;

/// A client bound to the fastest endpoint of a network. Failed calls are
/// retried across the latency-ranked endpoints of the shared cache.
#[derive(Clone)]
pub struct FailoverProvider {
    network_id: NetworkId,
    endpoint: String,
    client: Arc<dyn RpcClient>,
    factory: Arc<dyn ClientFactory>,
    cache: Arc<EndpointCache>,
    options: FailoverOptions,
    logger: HandlerLogger,
    on_exhausted: Option<ExhaustionHook>,
}

impl std::fmt::Debug for FailoverProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverProvider")
            .field("network_id", &self.network_id)
            .field("endpoint", &self.endpoint)
            .field("resolved", &self.client.endpoint())
            .field("options", &self.options)
            .finish()
    }
}

impl FailoverProvider {
    pub fn new(
        network_id: NetworkId,
        endpoint: String,
        factory: Arc<dyn ClientFactory>,
        cache: Arc<EndpointCache>,
        options: FailoverOptions,
        logger: HandlerLogger,
    ) -> Result<Self> {
        let client = factory.connect(&endpoint)?;
        Ok(Self {
            network_id,
            endpoint,
            client,
            factory,
            cache,
            options,
            logger,
            on_exhausted: None,
        })
    }

    /// Runs `hook` each time a call fails on every candidate, so the owner
    /// can drop this binding.
    pub fn with_exhaustion_hook(mut self, hook: ExhaustionHook) -> Self {
        self.on_exhausted = Some(hook);
        self
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    /// The endpoint this provider was bound to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The address the bound client really talks to.
    pub fn resolved_endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn options(&self) -> &FailoverOptions {
        &self.options
    }

    pub async fn invoke(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);

        let primary_error = match self.send_via(&self.client, &request).await {
            Ok(result) => {
                self.logger.verbose(
                    "Successfully called provider method",
                    json!({ "method": method, "url": self.endpoint }),
                );
                return Ok(result);
            }
            Err(e) => e,
        };

        if self.options.disabled {
            self.logger.error(
                "Provider call failed, failover disabled",
                json!({ "method": method, "url": self.endpoint, "error": primary_error.to_string() }),
            );
            return Err(primary_error);
        }

        self.logger.debug(
            "Primary provider failed, failing over",
            json!({ "method": method, "url": self.endpoint, "error": primary_error.to_string() }),
        );

        self.failover(request, primary_error).await
    }

    async fn failover(&self, request: JsonRpcRequest, primary_error: RpcHandlerError) -> Result<Value> {
        let candidates = self.cache.ranked(self.network_id);

        if candidates.is_empty() {
            self.logger.fatal(
                "No RPCs available",
                json!({ "method": request.method, "params": request.params }),
            );
            return Err(RpcHandlerError::NoEndpointsAvailable {
                network_id: self.network_id,
            });
        }

        let deadline = self.options.max_duration.map(|d| Instant::now() + d);
        let total = self.options.retry_count as usize * candidates.len();
        let mut attempts = 0usize;
        let mut last_error = primary_error;

        'passes: for pass in 0..self.options.retry_count {
            for (url, latency) in &candidates {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    self.logger.error(
                        "Failover deadline exceeded",
                        json!({ "method": request.method, "attempts": attempts }),
                    );
                    break 'passes;
                }

                attempts += 1;
                match self.attempt(url, &request).await {
                    Ok(result) => {
                        self.logger.debug(
                            "Successfully called provider method",
                            json!({ "method": request.method, "url": url, "pass": pass + 1 }),
                        );
                        return Ok(result);
                    }
                    Err(e) => {
                        self.logger.debug(
                            "Provider attempt failed",
                            json!({ "url": url, "latency_ms": latency, "pass": pass + 1, "error": e.to_string() }),
                        );
                        last_error = e;
                    }
                }

                if attempts < total {
                    tokio::time::sleep(self.options.retry_delay).await;
                }
            }
        }

        self.logger.fatal(
            "Failed after all retries",
            json!({
                "method": request.method,
                "params": request.params,
                "candidates": candidates,
                "error": last_error.to_string(),
            }),
        );

        if let Some(hook) = &self.on_exhausted {
            hook(self);
        }

        Err(RpcHandlerError::FailoverExhausted {
            network_id: self.network_id,
            method: request.method,
            params: request.params,
            candidates,
            attempts,
            last_error: Box::new(last_error),
        })
    }

    async fn attempt(&self, url: &str, request: &JsonRpcRequest) -> Result<Value> {
        let client = self.factory.connect(url)?;
        self.send_via(&client, request).await
    }

    async fn send_via(&self, client: &Arc<dyn RpcClient>, request: &JsonRpcRequest) -> Result<Value> {
        client.send(request).await?.into_result(client.endpoint())
    }
}
