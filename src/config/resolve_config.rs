use std::time::Duration;

use crate::{
    chainlist,
    logging::LogLevel,
    provider::FailoverOptions,
    rpc::select_base_rpc_set,
    types::{HandlerConfig, NetworkId, NetworkName, ProbeMode},
    Result, RpcHandlerError,
};

#[derive(Debug, Clone)]
pub struct NormalizedConfig {
    /// The network ID to use for RPC calls
    pub network_id: NetworkId,
    /// Display name, from the config or the chainlist
    pub network_name: NetworkName,
    /// Registered endpoints: injected RPCs followed by chainlist RPCs
    pub rpcs: Vec<String>,
    /// Candidates for the first probe cycle, if pre-seeded
    pub runtime_rpcs: Option<Vec<String>>,
    /// Retry settings for failed RPC calls
    pub retry: RetryConfig,
    /// General settings
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub failover: FailoverOptions,
    pub rpc_call_timeout: Duration,
    pub log_level: LogLevel,
    pub strict_logs: bool,
}

#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Timeout for each latency probe
    pub rpc_timeout: Duration,
    /// Probe cycles between two full refreshes
    pub cache_refresh_cycles: u32,
    pub probe_mode: ProbeMode,
    /// Whether latencies are handed to the cache store after each cycle
    pub persist_cache: bool,
    pub storage_namespace: String,
    /// Log level for the handler itself
    pub log_level: LogLevel,
}

pub fn resolve_config(config: HandlerConfig) -> Result<NormalizedConfig> {
    let network_id = config.network_id;
    let settings = config.settings.unwrap_or_default();

    if settings.cache_refresh_cycles == 0 {
        return Err(RpcHandlerError::InvalidConfig(
            "cache_refresh_cycles must be at least 1".to_string(),
        ));
    }

    if settings.rpc_probe_timeout_ms == 0 {
        return Err(RpcHandlerError::InvalidConfig(
            "rpc_probe_timeout_ms must be greater than 0".to_string(),
        ));
    }

    let network_name = settings
        .network_name
        .clone()
        .or_else(|| chainlist::get_network_name(network_id))
        .unwrap_or_else(|| format!("network_{network_id}"));

    let rpcs = select_base_rpc_set(network_id, &settings.network_rpcs);

    let proxy = &settings.proxy_settings;

    Ok(NormalizedConfig {
        network_id,
        network_name,
        rpcs,
        runtime_rpcs: settings
            .runtime_rpcs
            .map(|rpcs| rpcs.iter().map(|rpc| crate::rpc::remove_trailing_slash(rpc)).collect()),
        retry: RetryConfig {
            failover: FailoverOptions::from(proxy),
            rpc_call_timeout: Duration::from_millis(proxy.rpc_call_timeout_ms),
            log_level: proxy.log_level,
            strict_logs: proxy.strict_logs,
        },
        settings: SettingsConfig {
            rpc_timeout: Duration::from_millis(settings.rpc_probe_timeout_ms),
            cache_refresh_cycles: settings.cache_refresh_cycles,
            probe_mode: settings.probe_mode,
            persist_cache: settings.persist_cache,
            storage_namespace: settings.storage_namespace,
            log_level: settings.log_level,
        },
    })
}
