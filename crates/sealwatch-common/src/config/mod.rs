//! Configuration types for the sealwatch system

use {
    serde::{Deserialize, Serialize},
    std::{fs, path::Path},
};

use crate::errors::Result;
use crate::types::BlockNumber;

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const ENV_RPC_URL: &str = "SEALWATCH_RPC_URL";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How a block producer's own seal bit is treated.
///
/// The producer of a block cannot meaningfully miss the seal it is part of
/// producing, so its status is always forced to signed in per-block output.
/// Whether the accumulated counters follow the forced bit or the raw one is
/// a deployment choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerOverride {
    /// Force the producer to signed in per-block output only; counters
    /// follow the raw seal bit.
    #[default]
    DisplayOnly,
    /// Apply the override to the accumulated counters as well.
    Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub rpc_url: String,
    pub start_block: Option<i64>,
    pub end_block: Option<BlockNumber>,
    pub poll_interval_ms: u64,
    pub signed_symbol: String,
    pub missed_symbol: String,
    pub show_addresses: bool,
    pub producer_override: ProducerOverride,
    /// Seconds between live summary log lines; zero disables them.
    pub stats_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            start_block: None,
            end_block: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            signed_symbol: ".".to_string(),
            missed_symbol: "X".to_string(),
            show_addresses: true,
            producer_override: ProducerOverride::default(),
            stats_interval_secs: 0,
        }
    }
}

impl MonitorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str::<Self>(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.producer_override, ProducerOverride::DisplayOnly);
        assert!(config.show_addresses);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"rpc_url": "http://node:8545", "start_block": -50}"#).unwrap();
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.start_block, Some(-50));
        assert_eq!(config.missed_symbol, "X");
    }

    #[test]
    fn test_producer_override_roundtrip() {
        let json = serde_json::to_string(&ProducerOverride::Counters).unwrap();
        assert_eq!(json, r#""counters""#);
        let back: ProducerOverride = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProducerOverride::Counters);
    }
}
