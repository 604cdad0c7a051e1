//! Process configuration from environment variables.
//!
//! `EXCHANGE_ADDR` (default `0.0.0.0:8080`) and `MATCH_INTERVAL_MS` (default 20).
//! Logging is configured separately through `RUST_LOG`.

use std::time::Duration;

use crate::engine::{EngineConfig, DEFAULT_MATCH_INTERVAL};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let addr = lookup("EXCHANGE_ADDR")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let match_interval = lookup("MATCH_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MATCH_INTERVAL);
        Self {
            addr,
            engine: EngineConfig { match_interval },
        }
    }
}
