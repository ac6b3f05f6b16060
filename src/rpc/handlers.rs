use std::sync::Arc;

use dashmap::DashMap;
use tracing::error;

use crate::{
    cache::CacheStore, transport::ClientFactory, HandlerConfig, NetworkId, Result, RpcHandler,
    RpcHandlerError,
};

/// One [`RpcHandler`] per network, owned by the caller.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<NetworkId, Arc<RpcHandler>>,
    factory: Option<Arc<dyn ClientFactory>>,
    store: Option<Arc<dyn CacheStore>>,
}

impl HandlerRegistry {
    /// Handlers talk HTTP and keep their caches in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(factory: Option<Arc<dyn ClientFactory>>, store: Option<Arc<dyn CacheStore>>) -> Self {
        Self {
            handlers: DashMap::new(),
            factory,
            store,
        }
    }

    pub fn get(&self, network_id: NetworkId) -> Option<Arc<RpcHandler>> {
        self.handlers.get(&network_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the handler for `network_id`, building it from `config` on
    /// first use. Later calls ignore `config`.
    pub async fn get_or_init(&self, network_id: NetworkId, config: Option<HandlerConfig>) -> Result<Arc<RpcHandler>> {
        if let Some(handler) = self.get(network_id) {
            return Ok(handler);
        }

        let Some(config) = config else {
            error!(
                fatal = true,
                network_id,
                known_networks = ?self.network_ids(),
                "No handler config supplied for first use of network"
            );
            return Err(RpcHandlerError::ConfigMissing { network_id });
        };
        if config.network_id != network_id {
            return Err(RpcHandlerError::InvalidConfig(format!(
                "config is for network {} but handler was requested for {network_id}",
                config.network_id
            )));
        }

        let handler = match &self.factory {
            Some(factory) => RpcHandler::with_parts(config, Arc::clone(factory), self.store.clone()).await?,
            None => RpcHandler::with_store(config, self.store.clone()).await?,
        };

        // a concurrent initializer may have won the race
        let entry = self.handlers.entry(network_id).or_insert(Arc::new(handler));
        Ok(Arc::clone(entry.value()))
    }

    pub fn remove(&self, network_id: NetworkId) -> Option<Arc<RpcHandler>> {
        self.handlers.remove(&network_id).map(|(_, handler)| handler)
    }

    pub fn network_ids(&self) -> Vec<NetworkId> {
        let mut ids: Vec<NetworkId> = self.handlers.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
