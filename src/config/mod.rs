pub mod resolve_config;

pub use resolve_config::{resolve_config, NormalizedConfig, RetryConfig, SettingsConfig};
