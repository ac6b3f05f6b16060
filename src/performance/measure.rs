use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{future::join_all, stream::FuturesUnordered, StreamExt};

use crate::{
    performance::is_valid_block_response, transport::ClientFactory, types::ProbeMode,
    JsonRpcRequest, Result, RpcHandlerError,
};

#[derive(Debug)]
pub struct RpcCheckResult {
    pub url: String,
    /// Round trip in milliseconds, or why the endpoint was not measured.
    pub outcome: Result<f64>,
}

impl RpcCheckResult {
    pub fn latency(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// Fans one bounded request out to every candidate and times the valid answers.
#[derive(Clone)]
pub struct LatencyProbe {
    factory: Arc<dyn ClientFactory>,
    request: JsonRpcRequest,
    timeout: Duration,
    mode: ProbeMode,
}

impl LatencyProbe {
    pub fn new(factory: Arc<dyn ClientFactory>, timeout: Duration, mode: ProbeMode) -> Self {
        Self {
            factory,
            request: JsonRpcRequest::latest_block(),
            timeout,
            mode,
        }
    }

    pub fn with_request(mut self, request: JsonRpcRequest) -> Self {
        self.request = request;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    /// Successful `(endpoint, latency_ms)` pairs. Never fails: an empty vec
    /// means no candidate answered with a valid block in time.
    pub async fn probe(&self, candidates: &[String]) -> Vec<(String, f64)> {
        self.measure_rpcs(candidates)
            .await
            .into_iter()
            .filter_map(|check| check.latency().map(|ms| (check.url, ms)))
            .collect()
    }

    /// Every candidate's outcome in `Settle` mode. In `Race` mode, the
    /// outcomes that completed up to and including the winner; probes still
    /// in flight when it answered are abandoned and not reported.
    pub async fn measure_rpcs(&self, candidates: &[String]) -> Vec<RpcCheckResult> {
        match self.mode {
            ProbeMode::Settle => {
                let tasks: Vec<_> = candidates.iter().map(|url| self.check(url)).collect();
                join_all(tasks).await
            }
            ProbeMode::Race => {
                let mut in_flight: FuturesUnordered<_> =
                    candidates.iter().map(|url| self.check(url)).collect();
                let mut completed = Vec::new();

                while let Some(check) = in_flight.next().await {
                    let won = check.outcome.is_ok();
                    completed.push(check);
                    if won {
                        // dropping `in_flight` abandons the slower probes
                        break;
                    }
                }

                completed
            }
        }
    }

    async fn check(&self, url: &str) -> RpcCheckResult {
        RpcCheckResult {
            url: url.to_string(),
            outcome: self.time_request(url).await,
        }
    }

    async fn time_request(&self, url: &str) -> Result<f64> {
        let client = self.factory.connect(url)?;
        let start = Instant::now();

        let response = tokio::time::timeout(self.timeout, client.send(&self.request))
            .await
            .map_err(|_| RpcHandlerError::ProbeTimeout {
                endpoint: url.to_string(),
                duration_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| RpcHandlerError::ProbeTransport {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;

        let latency = start.elapsed().as_secs_f64() * 1000.0;

        let body = serde_json::to_value(&response)?;
        if !is_valid_block_response(&body) {
            return Err(RpcHandlerError::InvalidProbeResponse {
                endpoint: url.to_string(),
            });
        }

        Ok(latency.max(f64::EPSILON))
    }
}
