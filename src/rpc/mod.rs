pub mod handlers;
pub mod select_base_rpc_set;

pub use handlers::HandlerRegistry;
pub use select_base_rpc_set::{remove_trailing_slash, select_base_rpc_set};
