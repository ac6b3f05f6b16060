use std::cmp::Ordering;

use crate::{cache::LatencyTable, NetworkId, Result, RpcHandlerError};

/// Orders `(endpoint, latency)` pairs by latency, then by endpoint string so
/// that equal latencies always rank the same way.
pub fn compare_latency(a: &(String, f64), b: &(String, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}

/// Every endpoint measured for `network_id`, fastest first.
pub fn rank_endpoints(latencies: &LatencyTable, network_id: NetworkId) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = latencies
        .iter()
        .filter(|(key, _)| key.network_id == network_id)
        .map(|(key, latency)| (key.endpoint.clone(), *latency))
        .collect();

    ranked.sort_by(compare_latency);
    ranked
}

pub fn pick_fastest(latencies: &LatencyTable, network_id: NetworkId) -> Result<String> {
    latencies
        .iter()
        .filter(|(key, _)| key.network_id == network_id)
        .map(|(key, latency)| (key.endpoint.clone(), *latency))
        .min_by(compare_latency)
        .map(|(url, _)| url)
        .ok_or(RpcHandlerError::NoLatencyData { network_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LatencyKey;

    fn table(entries: &[(NetworkId, &str, f64)]) -> LatencyTable {
        entries
            .iter()
            .map(|(id, url, ms)| (LatencyKey::new(*id, *url), *ms))
            .collect()
    }

    #[test]
    fn test_pick_fastest_minimum_latency() {
        let latencies = table(&[(1, "A", 120.0), (1, "B", 80.0), (1, "C", 200.0)]);
        assert_eq!(pick_fastest(&latencies, 1).unwrap(), "B");
    }

    #[test]
    fn test_pick_fastest_ignores_other_networks() {
        let latencies = table(&[(1, "A", 120.0), (2, "B", 1.0)]);
        assert_eq!(pick_fastest(&latencies, 1).unwrap(), "A");
        assert!(matches!(
            pick_fastest(&latencies, 3),
            Err(RpcHandlerError::NoLatencyData { network_id: 3 })
        ));
    }

    #[test]
    fn test_ties_break_on_endpoint() {
        let latencies = table(&[(1, "https://b", 50.0), (1, "https://a", 50.0), (1, "https://c", 10.0)]);
        assert_eq!(pick_fastest(&latencies, 1).unwrap(), "https://c");

        let ranked = rank_endpoints(&latencies, 1);
        let order: Vec<&str> = ranked.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(order, vec!["https://c", "https://a", "https://b"]);
    }
}
