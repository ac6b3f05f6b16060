use url::Url;

use crate::{chainlist, NetworkId};

/// The registered endpoint list for a network: injected RPCs first, then the
/// chainlist entries, normalized and without duplicates.
pub fn select_base_rpc_set(network_id: NetworkId, injected_rpcs: &[Url]) -> Vec<String> {
    let mut rpcs: Vec<String> = Vec::new();

    let injected = injected_rpcs.iter().map(|url| url.to_string());
    let chainlist_rpcs = chainlist::get_extra_rpcs(network_id);

    for rpc in injected.chain(chainlist_rpcs) {
        let rpc = remove_trailing_slash(&rpc);
        if !rpcs.contains(&rpc) {
            rpcs.push(rpc);
        }
    }

    rpcs
}

pub fn remove_trailing_slash(rpc: &str) -> String {
    rpc.strip_suffix('/').unwrap_or(rpc).to_string()
}
