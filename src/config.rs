//! Configuration management for HashLedger

use crate::error::ChainError;
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File read by [`load_config`] when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "hashledger.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_block_reward")]
    pub block_reward: f64,
    #[serde(default = "default_max_reward_transactions")]
    pub max_reward_transactions: Option<usize>,
    #[serde(default)]
    pub require_proof_of_work: bool,
}

impl LedgerConfig {
    /// The reward as a ledger amount; `None` when it does not fit.
    pub fn block_reward_amount(&self) -> Option<Amount> {
        if !self.block_reward.is_finite() {
            return None;
        }
        Amount::checked_from_num(self.block_reward)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            block_reward: default_block_reward(),
            max_reward_transactions: default_max_reward_transactions(),
            require_proof_of_work: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_nonce_length")]
    pub nonce_length: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Give up after this many seconds; unbounded when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            nonce_length: default_nonce_length(),
            threads: default_threads(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl TransportConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ChainError> {
        match self.ledger.block_reward_amount() {
            Some(reward) if reward >= Amount::ZERO => {}
            _ => {
                return Err(ChainError::ConfigError(format!(
                    "ledger.block_reward must be a non-negative amount, got {}",
                    self.ledger.block_reward
                )))
            }
        }
        if self.miner.difficulty > 32 {
            return Err(ChainError::ConfigError(format!(
                "miner.difficulty must be at most 32 bytes, got {}",
                self.miner.difficulty
            )));
        }
        if self.miner.nonce_length == 0 {
            return Err(ChainError::ConfigError(
                "miner.nonce_length must be at least 1".to_string(),
            ));
        }
        if self.transport.host.is_empty() {
            return Err(ChainError::ConfigError(
                "transport.host must be set".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_block_reward() -> f64 {
    25.0
}

fn default_max_reward_transactions() -> Option<usize> {
    Some(1)
}

fn default_difficulty() -> u32 {
    2
}

fn default_nonce_length() -> usize {
    16
}

fn default_threads() -> usize {
    1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5005
}

fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("/nonexistent/hashledger.toml").unwrap();
        assert_eq!(config.ledger.block_reward_amount(), Some(Amount::from_num(25)));
        assert_eq!(config.ledger.max_reward_transactions, Some(1));
        assert_eq!(config.miner.difficulty, 2);
        assert_eq!(config.transport.address(), "127.0.0.1:5005");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ledger]\nblock_reward = 50.0\n\n[miner]\ndifficulty = 1\nthreads = 4"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.ledger.block_reward_amount(), Some(Amount::from_num(50)));
        assert_eq!(config.miner.difficulty, 1);
        assert_eq!(config.miner.threads, 4);
        assert_eq!(config.miner.nonce_length, 16);
        assert_eq!(config.transport.port, 5005);
    }

    #[test]
    fn test_negative_reward_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\nblock_reward = -1.0").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }

    #[test]
    fn test_unreachable_difficulty_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[miner]\ndifficulty = 40").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rules_follow_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\nrequire_proof_of_work = true\n\n[miner]\ndifficulty = 3").unwrap();

        let config = load_config(file.path()).unwrap();
        let rules = crate::blockchain::ValidationRules::from(&config);
        assert!(rules.require_proof_of_work);
        assert_eq!(rules.min_difficulty, 3);
        assert_eq!(rules.block_reward, Amount::from_num(25));
    }
}
