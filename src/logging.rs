use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NetworkId;

/// Severity tiers for handler events, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Fatal,
    Error,
    Ok,
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    /// Position on the verbosity scale. `Ok` and `Info` share a rank.
    pub fn rank(self) -> u8 {
        match self {
            LogLevel::Fatal => 0,
            LogLevel::Error => 1,
            LogLevel::Ok | LogLevel::Info => 2,
            LogLevel::Debug => 3,
            LogLevel::Verbose => 4,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::RpcHandlerError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "ok" => Ok(LogLevel::Ok),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(crate::RpcHandlerError::InvalidConfig(format!(
                "unknown log level `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandlerLogger {
    level: LogLevel,
    strict: bool,
    network_id: NetworkId,
    network_name: String,
}

impl HandlerLogger {
    pub fn new(level: LogLevel, strict: bool, network_id: NetworkId, network_name: impl Into<String>) -> Self {
        Self {
            level,
            strict,
            network_id,
            network_name: network_name.into(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Strict loggers only emit their exact tier, others emit everything at or
    /// below the configured verbosity.
    pub fn enabled(&self, tier: LogLevel) -> bool {
        if self.strict {
            tier == self.level
        } else {
            tier.rank() <= self.level.rank()
        }
    }

    pub fn log(&self, tier: LogLevel, msg: &str, metadata: Value) {
        if !self.enabled(tier) {
            return;
        }

        let network = self.network_name.as_str();
        let network_id = self.network_id;

        match tier {
            LogLevel::Fatal => tracing::error!(
                fatal = true,
                network = %network,
                network_id,
                metadata = %metadata,
                "{msg}"
            ),
            LogLevel::Error => tracing::error!(
                network = %network,
                network_id,
                metadata = %metadata,
                "{msg}"
            ),
            LogLevel::Ok | LogLevel::Info => tracing::info!(
                network = %network,
                network_id,
                metadata = %metadata,
                "{msg}"
            ),
            LogLevel::Debug => tracing::debug!(
                network = %network,
                network_id,
                metadata = %metadata,
                "{msg}"
            ),
            LogLevel::Verbose => tracing::trace!(
                network = %network,
                network_id,
                metadata = %metadata,
                "{msg}"
            ),
        }
    }

    pub fn fatal(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Fatal, msg, metadata)
    }

    pub fn error(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Error, msg, metadata)
    }

    pub fn ok(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Ok, msg, metadata)
    }

    pub fn info(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Info, msg, metadata)
    }

    pub fn debug(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Debug, msg, metadata)
    }

    pub fn verbose(&self, msg: &str, metadata: Value) {
        self.log(LogLevel::Verbose, msg, metadata)
    }
}
