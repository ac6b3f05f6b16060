use std::{sync::Arc, time::Duration};

use rpc_failover::{EthRpc, HandlerConfig, HandlerRegistry, HandlerSettings, MemoryStore, ProxySettings};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let settings = HandlerSettings {
        persist_cache: true,
        storage_namespace: "demo".to_string(),
        proxy_settings: ProxySettings {
            retry_count: 2,
            retry_delay_ms: 250,
            max_duration_ms: Some(15_000),
            ..Default::default()
        },
        ..Default::default()
    };

    let registry = HandlerRegistry::with_parts(None, Some(Arc::new(MemoryStore::new())));
    let handler = registry.get_or_init(1, Some(HandlerConfig::with_settings(1, settings))).await?;

    let token = CancellationToken::new();
    let refresher = handler.spawn_background_refresh(Duration::from_secs(30), token.clone());

    let provider = handler.ensure_client().await?;
    println!("Bound to {}", provider.endpoint());

    // every call below falls back to the ranked endpoints if the fastest one fails
    let chain_id = provider.chain_id().await?;
    let gas_price = provider.gas_price().await?;
    let balance = provider
        .get_balance("0x0000000000000000000000000000000000000000", "latest")
        .await?;
    println!("chain id {chain_id}, gas price {gas_price} wei, burn address balance {balance} wei");

    let provider = handler.refresh().await?;
    println!("After a forced refresh: {} (cycle {})", provider.endpoint(), handler.get_refresh_count());

    token.cancel();
    refresher.await?;
    Ok(())
}
