use serde::{Deserialize, Serialize};
use url::Url;

use crate::logging::LogLevel;

pub type NetworkId = u64;
pub type NetworkName = String;
pub type Endpoint = String;

/// How a probe cycle treats the responses of its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeMode {
    /// Wait for every candidate to settle and record every successful latency.
    #[default]
    Settle,
    /// Stop at the first valid response and record only that one. In-flight
    /// probes of the remaining candidates are dropped.
    Race,
}

// structs are effectively data objects

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    pub network_id: NetworkId,
    pub settings: Option<HandlerSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerSettings {
    pub log_level: LogLevel,
    pub network_name: Option<NetworkName>,
    /// Endpoints registered on top of the static chainlist entries.
    pub network_rpcs: Vec<Url>,
    /// Candidate list used for the first probe cycle instead of the full registry.
    pub runtime_rpcs: Option<Vec<String>>,
    pub cache_refresh_cycles: u32,
    pub rpc_probe_timeout_ms: u64,
    pub probe_mode: ProbeMode,
    pub persist_cache: bool,
    pub storage_namespace: String,
    pub proxy_settings: ProxySettings,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            network_name: None,
            network_rpcs: vec![],
            runtime_rpcs: None,
            cache_refresh_cycles: 3,
            rpc_probe_timeout_ms: 3000,
            probe_mode: ProbeMode::Settle,
            persist_cache: false,
            storage_namespace: "default".to_string(),
            proxy_settings: ProxySettings::default(),
        }
    }
}

/**
 * Think of `impl xyz` as a class, with `new()` being the constructor.
 *
 * A config built with `new()` carries the default settings so that only the
 * network id is needed to get a working handler.
 */

impl HandlerConfig {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            settings: Some(HandlerSettings::default()),
        }
    }

    pub fn with_settings(network_id: NetworkId, settings: HandlerSettings) -> Self {
        Self {
            network_id,
            settings: Some(settings),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub rpc_call_timeout_ms: u64,
    pub log_level: LogLevel,
    pub strict_logs: bool,
    /// Turns the failover provider into a plain passthrough.
    pub disabled: bool,
    pub max_duration_ms: Option<u64>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay_ms: 100,
            rpc_call_timeout_ms: 10000,
            log_level: LogLevel::Info,
            strict_logs: false,
            disabled: false,
            max_duration_ms: None,
        }
    }
}
