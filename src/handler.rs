use std::{collections::BTreeMap, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{
        storage_key,
        store::{load_persisted, save_persisted},
        CacheStore, EndpointCache, Freshness,
    },
    chainlist,
    config::{resolve_config, NormalizedConfig},
    logging::HandlerLogger,
    performance::LatencyProbe,
    provider::{ExhaustionHook, FailoverProvider},
    transport::{is_loopback, ClientFactory, HttpClientFactory},
    HandlerConfig, NetworkId, Result, RpcHandlerError,
};

/// Keeps the latency cache of one network fresh and hands out failover
/// providers bound to its fastest endpoint.
pub struct RpcHandler {
    config: NormalizedConfig,
    cache: Arc<EndpointCache>,
    probe: LatencyProbe,
    factory: Arc<dyn ClientFactory>,
    store: Option<Arc<dyn CacheStore>>,
    // shared with the bound provider's exhaustion hook
    provider: Arc<RwLock<Option<Arc<FailoverProvider>>>>,
    runtime_rpcs: RwLock<Vec<String>>,
    seeded_rpcs: Mutex<Option<Vec<String>>>,
    // serializes probe cycles; readers never take it
    refresh_lock: tokio::sync::Mutex<()>,
    logger: HandlerLogger,
    proxy_logger: HandlerLogger,
}

impl RpcHandler {
    pub async fn new(config: HandlerConfig) -> Result<Self> {
        Self::with_store(config, None).await
    }

    pub async fn with_store(config: HandlerConfig, store: Option<Arc<dyn CacheStore>>) -> Result<Self> {
        let call_timeout = config
            .settings
            .as_ref()
            .map(|s| s.proxy_settings.rpc_call_timeout_ms)
            .unwrap_or(10000);
        let factory = Arc::new(HttpClientFactory::new(Duration::from_millis(call_timeout)));
        Self::with_parts(config, factory, store).await
    }

    pub async fn with_parts(
        config: HandlerConfig,
        factory: Arc<dyn ClientFactory>,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Result<Self> {
        let config = resolve_config(config)?;
        let network_id = config.network_id;

        let logger = HandlerLogger::new(config.settings.log_level, false, network_id, &config.network_name);
        let proxy_logger = HandlerLogger::new(
            config.retry.log_level,
            config.retry.strict_logs,
            network_id,
            &config.network_name,
        );

        let cache = Arc::new(EndpointCache::new(config.settings.cache_refresh_cycles));
        let probe = LatencyProbe::new(
            Arc::clone(&factory),
            config.settings.rpc_timeout,
            config.settings.probe_mode,
        );

        let mut seeded_rpcs = config.runtime_rpcs.clone();

        if config.settings.persist_cache {
            if let Some(store) = store.as_deref() {
                let key = storage_key(&config.settings.storage_namespace, network_id);
                match load_persisted(store, &key).await {
                    Ok(Some(persisted)) => {
                        let restored = cache.restore(network_id, &persisted);
                        logger.debug(
                            "Loaded persisted latency cache",
                            json!({ "key": key, "entries": restored, "refresh_count": persisted.refresh_count }),
                        );
                        if restored > 0 {
                            seeded_rpcs = None;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => logger.error(
                        "Failed to load persisted latency cache",
                        json!({ "key": key, "error": e.to_string() }),
                    ),
                }
            }
        }

        let runtime_rpcs = seeded_rpcs.clone().unwrap_or_else(|| config.rpcs.clone());

        Ok(Self {
            config,
            cache,
            probe,
            factory,
            store,
            provider: Arc::new(RwLock::new(None)),
            runtime_rpcs: RwLock::new(runtime_rpcs),
            seeded_rpcs: Mutex::new(seeded_rpcs),
            refresh_lock: tokio::sync::Mutex::new(()),
            logger,
            proxy_logger,
        })
    }

    pub fn get_network_id(&self) -> NetworkId {
        self.config.network_id
    }

    pub fn get_network_name(&self) -> &str {
        &self.config.network_name
    }

    /// The registered endpoint list.
    pub fn get_network_rpcs(&self) -> &[String] {
        &self.config.rpcs
    }

    /// The candidate set of the latest probe cycle.
    pub fn get_runtime_rpcs(&self) -> Vec<String> {
        self.runtime_rpcs.read().clone()
    }

    pub fn get_latencies(&self) -> BTreeMap<String, f64> {
        self.cache.network_latencies(self.config.network_id)
    }

    pub fn get_refresh_count(&self) -> u32 {
        self.cache.refresh_state(self.config.network_id).count
    }

    pub fn cache(&self) -> Arc<EndpointCache> {
        Arc::clone(&self.cache)
    }

    /// The bound provider. Unset until the first successful selection, and
    /// again after a call exhausts every failover candidate.
    pub fn current_client(&self) -> Result<Arc<FailoverProvider>> {
        if let Some(provider) = self.provider.read().clone() {
            return Ok(provider);
        }

        self.logger.fatal(
            "No RPC client is bound",
            json!({ "candidates": self.get_runtime_rpcs(), "refresh_count": self.get_refresh_count() }),
        );
        Err(RpcHandlerError::ClientUninitialized {
            network_id: self.config.network_id,
        })
    }

    /// Runs a probe cycle over the stale or fresh candidate set, then binds a
    /// provider to the fastest endpoint.
    pub async fn ensure_client(&self) -> Result<Arc<FailoverProvider>> {
        let _guard = self.refresh_lock.lock().await;
        self.run_cycle(false).await;
        self.bind_fastest().await
    }

    /// Like [`ensure_client`](Self::ensure_client) but always probes the full
    /// registered endpoint list.
    pub async fn refresh(&self) -> Result<Arc<FailoverProvider>> {
        let _guard = self.refresh_lock.lock().await;
        self.run_cycle(true).await;
        self.bind_fastest().await
    }

    /// Calls [`refresh`](Self::refresh) every `period` until `token` is cancelled.
    pub fn spawn_background_refresh(self: &Arc<Self>, period: Duration, token: CancellationToken) -> JoinHandle<()> {
        let handler = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = handler.refresh().await {
                            handler.logger.error(
                                "Background refresh failed",
                                json!({ "error": e.to_string() }),
                            );
                        }
                    }
                }
            }

            handler.logger.debug("Background refresh stopped", json!({}));
        })
    }

    async fn run_cycle(&self, force_full: bool) {
        let network_id = self.config.network_id;
        let seeded = self.seeded_rpcs.lock().take();

        let (freshness, candidates) = match seeded {
            Some(seeded) if !force_full => (Freshness::Stale, self.cache.plan_full_cycle(network_id, &seeded)),
            _ if force_full => (Freshness::Stale, self.cache.plan_full_cycle(network_id, &self.config.rpcs)),
            _ => self.cache.plan_cycle(network_id, &self.config.rpcs),
        };

        *self.runtime_rpcs.write() = candidates.clone();

        let mut probed = Vec::with_capacity(candidates.len());
        let mut measured = Vec::with_capacity(candidates.len());

        if candidates.is_empty() {
            self.logger.error("No candidate RPCs to probe", json!({}));
        } else {
            for check in self.probe.measure_rpcs(&candidates).await {
                match check.outcome {
                    Ok(latency) => measured.push((check.url.clone(), latency)),
                    Err(e) => self.logger.debug(
                        "RPC probe failed",
                        json!({ "url": check.url, "error": e.to_string() }),
                    ),
                }
                probed.push(check.url);
            }
        }

        let state = self.cache.complete_cycle(network_id, &probed, &measured);

        self.logger.info(
            "Probe cycle complete",
            json!({
                "full_refresh": freshness == Freshness::Stale,
                "candidates": candidates.len(),
                "measured": measured.len(),
                "refresh_count": state.count,
            }),
        );

        self.persist().await;
    }

    async fn persist(&self) {
        if !self.config.settings.persist_cache {
            return;
        }
        let Some(store) = self.store.as_deref() else {
            return;
        };

        let key = storage_key(&self.config.settings.storage_namespace, self.config.network_id);
        let persisted = self.cache.to_persisted(self.config.network_id);

        if let Err(e) = save_persisted(store, &key, &persisted).await {
            self.logger.error(
                "Failed to persist latency cache",
                json!({ "key": key, "error": e.to_string() }),
            );
        }
    }

    /// Binds a provider to the fastest endpoint. A client that silently
    /// resolved to loopback for a non-local network gets one more full
    /// probe cycle before giving up.
    async fn bind_fastest(&self) -> Result<Arc<FailoverProvider>> {
        let provider = self.select_provider()?;

        let Some(resolved) = self.loopback_mismatch(&provider) else {
            return Ok(self.bind(provider));
        };

        self.logger.error(
            "Client resolved to loopback for a non-local network, reselecting",
            json!({ "selected": provider.endpoint(), "resolved": resolved }),
        );
        self.run_cycle(true).await;

        let provider = self.select_provider()?;
        match self.loopback_mismatch(&provider) {
            None => Ok(self.bind(provider)),
            Some(resolved) => {
                self.logger.fatal(
                    "Client resolved to loopback for a non-local network",
                    json!({ "selected": provider.endpoint(), "resolved": resolved }),
                );
                Err(RpcHandlerError::LoopbackMismatch {
                    network_id: self.config.network_id,
                    selected: provider.endpoint().to_string(),
                    resolved,
                })
            }
        }
    }

    fn select_provider(&self) -> Result<Arc<FailoverProvider>> {
        let network_id = self.config.network_id;

        let fastest = self.cache.fastest(network_id).inspect_err(|e| {
            self.logger.fatal(
                "Failed to select fastest RPC",
                json!({ "candidates": self.get_runtime_rpcs(), "error": e.to_string() }),
            );
        })?;

        let provider = FailoverProvider::new(
            network_id,
            fastest,
            Arc::clone(&self.factory),
            Arc::clone(&self.cache),
            self.config.retry.failover.clone(),
            self.proxy_logger.clone(),
        )?
        .with_exhaustion_hook(self.release_binding());

        Ok(Arc::new(provider))
    }

    /// Clears the bound provider once it has exhausted its failover, unless
    /// a newer binding already replaced it.
    fn release_binding(&self) -> ExhaustionHook {
        let slot = Arc::clone(&self.provider);
        let logger = self.logger.clone();

        Arc::new(move |exhausted: &FailoverProvider| {
            let mut slot = slot.write();
            if slot.as_deref().is_some_and(|bound| std::ptr::eq(bound, exhausted)) {
                *slot = None;
                logger.error(
                    "Failover exhausted, releasing bound RPC",
                    json!({ "url": exhausted.endpoint() }),
                );
            }
        })
    }

    /// The loopback address the provider's client resolved to, when the
    /// network is not a local one and the selected endpoint was not loopback.
    fn loopback_mismatch(&self, provider: &FailoverProvider) -> Option<String> {
        let resolved = provider.resolved_endpoint();
        let mismatch = !chainlist::is_local_network(self.config.network_id)
            && !is_loopback(provider.endpoint())
            && is_loopback(resolved);

        mismatch.then(|| resolved.to_string())
    }

    fn bind(&self, provider: Arc<FailoverProvider>) -> Arc<FailoverProvider> {
        self.logger.ok("Bound fastest RPC", json!({ "url": provider.endpoint() }));
        *self.provider.write() = Some(Arc::clone(&provider));
        provider
    }
}
