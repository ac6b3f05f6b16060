use rpc_failover::{chainlist, EthRpc, HandlerConfig, RpcHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let network_id = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>())
        .transpose()?
        .unwrap_or(100);

    println!("Known networks:");
    for (id, name) in chainlist::get_chain_ids() {
        println!("  - {name} ({id})");
    }

    let handler = RpcHandler::new(HandlerConfig::new(network_id)).await?;
    println!("Probing {} endpoints for {}", handler.get_network_rpcs().len(), handler.get_network_name());

    let provider = handler.ensure_client().await?;
    println!("Fastest RPC: {}", provider.endpoint());

    for (endpoint, latency) in handler.get_latencies() {
        println!("  {latency:>8.2}ms  {endpoint}");
    }

    let block = provider.block_number().await?;
    println!("Latest block: {block}");

    Ok(())
}
