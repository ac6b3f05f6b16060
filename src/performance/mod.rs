pub mod measure;
pub mod pick_fastest;
pub mod validate;

pub use measure::{LatencyProbe, RpcCheckResult};
pub use pick_fastest::{compare_latency, pick_fastest, rank_endpoints};
pub use validate::is_valid_block_response;
