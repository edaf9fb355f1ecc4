//! Configuration management for tallychain

use crate::error::{ChainError, Result};
use crate::pow;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Peer URLs registered at startup. Entries that fail address
    /// normalization are logged and skipped.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Amount of the reward transfer credited to this node on each mined
    /// block.
    #[serde(default = "default_reward")]
    pub reward: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
        }
    }
}

fn default_api_port() -> u16 {
    5000
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_difficulty() -> usize {
    pow::DEFAULT_DIFFICULTY
}

fn default_reward() -> u64 {
    20
}

/// Read `config.toml` from the working directory, with defaults when the
/// file is absent.
pub fn load_config() -> Result<Config> {
    let raw = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if raw.is_empty() {
        Config::default()
    } else {
        toml::from_str(&raw).map_err(|e| ChainError::Config(e.to_string()))?
    };

    // A SHA-256 hex digest has 64 characters; more leading zeros than that
    // can never be satisfied.
    if config.mining.difficulty > 64 {
        return Err(ChainError::Config(format!(
            "mining.difficulty must be at most 64, got {}",
            config.mining.difficulty
        )));
    }

    Ok(config)
}
