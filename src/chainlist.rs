use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::types::{NetworkId, NetworkName};

/// Networks that legitimately resolve to a loopback endpoint.
pub const LOCAL_NETWORK_IDS: [NetworkId; 2] = [31337, 1337];

#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub chain_id: NetworkId,
    pub name: NetworkName,
    pub rpcs: Vec<String>,
}

impl ChainInfo {
    fn seed(chain_id: NetworkId, name: &str, rpcs: &[&str]) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            rpcs: rpcs.iter().map(|rpc| rpc.to_string()).collect(),
        }
    }
}

/*
 * LazyLock builds the table on first access, the Mutex lets callers register
 * extra chains at runtime. Every accessor takes the lock for the duration of
 * a single read or write and clones out, so no guard is ever held across an
 * await point.
 */
static CHAIN_DATA: LazyLock<Arc<Mutex<Vec<ChainInfo>>>> = LazyLock::new(|| {
    Arc::new(Mutex::new(vec![
        ChainInfo::seed(
            1,
            "ethereum_mainnet",
            &[
                "https://eth.llamarpc.com",
                "https://ethereum-rpc.publicnode.com",
                "https://rpc.ankr.com/eth",
                "https://cloudflare-eth.com",
            ],
        ),
        ChainInfo::seed(
            100,
            "gnosis",
            &[
                "https://rpc.gnosischain.com",
                "https://gnosis-rpc.publicnode.com",
                "https://rpc.ankr.com/gnosis",
            ],
        ),
        ChainInfo::seed(
            11155111,
            "sepolia",
            &[
                "https://ethereum-sepolia-rpc.publicnode.com",
                "https://rpc.sepolia.org",
            ],
        ),
        ChainInfo::seed(31337, "anvil", &["http://127.0.0.1:8545"]),
        ChainInfo::seed(1337, "localhost", &["http://127.0.0.1:8545"]),
    ]))
});

pub fn is_local_network(chain_id: NetworkId) -> bool {
    LOCAL_NETWORK_IDS.contains(&chain_id)
}

/// Drops every chain not listed in `chains_to_retain`.
pub fn initialize_chain_data(chains_to_retain: Vec<NetworkId>) {
    CHAIN_DATA
        .lock()
        .retain(|chain| chains_to_retain.contains(&chain.chain_id));
}

/// Adds a chain, replacing any existing entry with the same id.
pub fn register_chain(info: ChainInfo) {
    let mut chains = CHAIN_DATA.lock();
    chains.retain(|chain| chain.chain_id != info.chain_id);
    chains.push(info);
}

pub fn get_chain_ids() -> Vec<(NetworkId, NetworkName)> {
    CHAIN_DATA
        .lock()
        .iter()
        .map(|chain| (chain.chain_id, chain.name.clone()))
        .collect()
}

pub fn get_chain_info(chain_id: NetworkId) -> Option<ChainInfo> {
    CHAIN_DATA
        .lock()
        .iter()
        .find(|chain| chain.chain_id == chain_id)
        .cloned()
}

pub fn get_network_name(chain_id: NetworkId) -> Option<NetworkName> {
    get_chain_info(chain_id).map(|chain| chain.name)
}

pub fn find_chains_by_name(name: &str) -> Vec<ChainInfo> {
    let search_term = name.to_lowercase();
    CHAIN_DATA
        .lock()
        .iter()
        .filter(|chain| chain.name.to_lowercase().contains(&search_term))
        .cloned()
        .collect()
}

pub fn get_extra_rpcs(chain_id: NetworkId) -> Vec<String> {
    get_chain_info(chain_id)
        .map(|chain| chain.rpcs)
        .unwrap_or_default()
}
