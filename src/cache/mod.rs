pub mod store;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{performance::rank_endpoints, NetworkId};

pub use store::{CacheStore, MemoryStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatencyKey {
    pub network_id: NetworkId,
    pub endpoint: String,
}

impl LatencyKey {
    pub fn new(network_id: NetworkId, endpoint: impl Into<String>) -> Self {
        Self {
            network_id,
            endpoint: endpoint.into(),
        }
    }

    /// `"<network_id>__<endpoint>"`, only used at the storage boundary.
    pub fn storage_key(&self) -> String {
        format!("{}__{}", self.network_id, self.endpoint)
    }

    /// The network id never contains `__`, so the first separator is the one
    /// that splits it from the endpoint.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (network_id, endpoint) = key.split_once("__")?;
        if endpoint.is_empty() {
            return None;
        }
        Some(Self::new(network_id.parse().ok()?, endpoint))
    }
}

/// Latency in milliseconds per `(network, endpoint)`.
pub type LatencyTable = HashMap<LatencyKey, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    pub count: u32,
    pub threshold: u32,
}

impl RefreshState {
    pub fn new(threshold: u32) -> Self {
        Self { count: 0, threshold }
    }

    pub fn is_due(&self) -> bool {
        self.count >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Probe the full registered endpoint list.
    Stale,
    /// Re-probe only endpoints that already have latency data.
    Fresh,
}

#[derive(Debug, Default)]
struct CacheInner {
    latencies: LatencyTable,
    refresh: HashMap<NetworkId, RefreshState>,
}

/// Scoped latency table plus per-network refresh counters.
///
/// Writers take the lock once per probe cycle so readers always see either
/// the previous or the next complete table.
#[derive(Debug)]
pub struct EndpointCache {
    inner: RwLock<CacheInner>,
    threshold: u32,
}

impl EndpointCache {
    pub fn new(cache_refresh_cycles: u32) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            threshold: cache_refresh_cycles,
        }
    }

    pub fn refresh_state(&self, network_id: NetworkId) -> RefreshState {
        self.inner
            .read()
            .refresh
            .get(&network_id)
            .copied()
            .unwrap_or_else(|| RefreshState::new(self.threshold))
    }

    pub fn freshness(&self, network_id: NetworkId) -> Freshness {
        let inner = self.inner.read();
        Self::freshness_of(&inner, network_id, self.threshold)
    }

    fn freshness_of(inner: &CacheInner, network_id: NetworkId, threshold: u32) -> Freshness {
        let entries = inner
            .latencies
            .keys()
            .filter(|key| key.network_id == network_id)
            .count();
        let state = inner
            .refresh
            .get(&network_id)
            .copied()
            .unwrap_or_else(|| RefreshState::new(threshold));

        if entries <= 1 || state.is_due() {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// Decides the candidate set for the next probe cycle. A stale network
    /// gets the full `registered` list and its counter reset to zero.
    pub fn plan_cycle(&self, network_id: NetworkId, registered: &[String]) -> (Freshness, Vec<String>) {
        let mut inner = self.inner.write();
        match Self::freshness_of(&inner, network_id, self.threshold) {
            Freshness::Stale => {
                inner
                    .refresh
                    .entry(network_id)
                    .or_insert_with(|| RefreshState::new(self.threshold))
                    .count = 0;
                (Freshness::Stale, registered.to_vec())
            }
            Freshness::Fresh => {
                let mut known: Vec<String> = inner
                    .latencies
                    .keys()
                    .filter(|key| key.network_id == network_id)
                    .map(|key| key.endpoint.clone())
                    .collect();
                known.sort();
                (Freshness::Fresh, known)
            }
        }
    }

    /// Resets the counter and hands back `registered`, whatever the freshness.
    pub fn plan_full_cycle(&self, network_id: NetworkId, registered: &[String]) -> Vec<String> {
        let mut inner = self.inner.write();
        inner
            .refresh
            .entry(network_id)
            .or_insert_with(|| RefreshState::new(self.threshold))
            .count = 0;
        registered.to_vec()
    }

    /// Records the outcome of a probe cycle and advances the refresh counter.
    ///
    /// `probed` lists every endpoint whose probe completed this cycle,
    /// successful or not. Those absent from `measured` failed and lose their
    /// entry. Endpoints that were never probed, such as the losers of a race
    /// that were abandoned in flight, keep theirs.
    pub fn complete_cycle(
        &self,
        network_id: NetworkId,
        probed: &[String],
        measured: &[(String, f64)],
    ) -> RefreshState {
        let mut inner = self.inner.write();
        for endpoint in probed {
            if !measured.iter().any(|(ok, _)| ok == endpoint) {
                inner.latencies.remove(&LatencyKey::new(network_id, endpoint.clone()));
            }
        }
        for (endpoint, latency) in measured {
            inner
                .latencies
                .insert(LatencyKey::new(network_id, endpoint.clone()), *latency);
        }

        let state = inner
            .refresh
            .entry(network_id)
            .or_insert_with(|| RefreshState::new(self.threshold));
        state.count = state.count.saturating_add(1);
        *state
    }

    pub fn latencies(&self) -> LatencyTable {
        self.inner.read().latencies.clone()
    }

    /// The latencies of one network keyed by endpoint.
    pub fn network_latencies(&self, network_id: NetworkId) -> BTreeMap<String, f64> {
        self.inner
            .read()
            .latencies
            .iter()
            .filter(|(key, _)| key.network_id == network_id)
            .map(|(key, latency)| (key.endpoint.clone(), *latency))
            .collect()
    }

    pub fn ranked(&self, network_id: NetworkId) -> Vec<(String, f64)> {
        rank_endpoints(&self.inner.read().latencies, network_id)
    }

    pub fn fastest(&self, network_id: NetworkId) -> crate::Result<String> {
        crate::performance::pick_fastest(&self.inner.read().latencies, network_id)
    }

    pub fn insert(&self, network_id: NetworkId, endpoint: impl Into<String>, latency_ms: f64) {
        self.inner
            .write()
            .latencies
            .insert(LatencyKey::new(network_id, endpoint), latency_ms);
    }

    pub fn remove(&self, network_id: NetworkId, endpoint: &str) -> Option<f64> {
        self.inner
            .write()
            .latencies
            .remove(&LatencyKey::new(network_id, endpoint))
    }

    pub fn to_persisted(&self, network_id: NetworkId) -> PersistedCache {
        let inner = self.inner.read();
        PersistedCache {
            latencies: inner
                .latencies
                .iter()
                .filter(|(key, _)| key.network_id == network_id)
                .map(|(key, latency)| (key.storage_key(), *latency))
                .collect(),
            refresh_count: inner
                .refresh
                .get(&network_id)
                .map(|state| state.count)
                .unwrap_or(0),
            updated_at: Utc::now(),
        }
    }

    /// Loads a persisted document for `network_id`; entries belonging to any
    /// other network, or with a non-positive latency, are dropped.
    /// Returns how many entries were restored.
    pub fn restore(&self, network_id: NetworkId, persisted: &PersistedCache) -> usize {
        let mut inner = self.inner.write();
        let mut restored = 0;

        for (raw_key, latency) in &persisted.latencies {
            let Some(key) = LatencyKey::from_storage_key(raw_key) else {
                continue;
            };
            if key.network_id != network_id || !(*latency > 0.0) {
                continue;
            }
            inner.latencies.insert(key, *latency);
            restored += 1;
        }

        inner
            .refresh
            .entry(network_id)
            .or_insert_with(|| RefreshState::new(self.threshold))
            .count = persisted.refresh_count;

        restored
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCache {
    pub latencies: BTreeMap<String, f64>,
    pub refresh_count: u32,
    pub updated_at: DateTime<Utc>,
}

pub fn storage_key(namespace: &str, network_id: NetworkId) -> String {
    format!("{namespace}:{network_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_round_trip_with_delimiter_in_endpoint() {
        let key = LatencyKey::new(100, "https://rpc.example/a__b");
        let parsed = LatencyKey::from_storage_key(&key.storage_key()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_storage_key_rejects_garbage() {
        assert!(LatencyKey::from_storage_key("no-separator").is_none());
        assert!(LatencyKey::from_storage_key("abc__https://x").is_none());
        assert!(LatencyKey::from_storage_key("1__").is_none());
    }
}
