pub mod methods;
pub mod retry_proxy;

pub use methods::EthRpc;
pub use retry_proxy::{ExhaustionHook, FailoverOptions, FailoverProvider};
