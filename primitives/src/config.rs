// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

/// Default number of blocks after which votes are reset and the signer list
/// is checkpointed.
pub const DEFAULT_EPOCH: u64 = 30_000;

/// Chain-wide configuration handed to the engines by the chain reader.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Proof-of-authority parameters, if the chain runs that engine
    pub clique: Option<CliqueConfig>,
    /// LDPC proof-of-work parameters, if the chain runs that engine
    pub ldpc: Option<LdpcConfig>,
}

impl ChainConfig {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Proof-of-authority engine parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliqueConfig {
    /// Minimum number of seconds between two consecutive blocks
    pub period: u64,
    /// Epoch length to reset votes and checkpoint
    pub epoch: u64,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self {
            period: 15,
            epoch: DEFAULT_EPOCH,
        }
    }
}

/// LDPC proof-of-work engine parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdpcConfig {
    /// Target seconds between blocks for difficulty retargeting
    pub block_generation_time: u64,
    /// Divisor applied to the parent difficulty per retarget step
    pub sensitivity: u64,
    /// Nonces tried per search round before reporting no solution
    pub max_attempts: usize,
    /// Mining threads, 0 selects the available parallelism
    pub workers: usize,
    /// Seconds a header timestamp may lead the local clock
    pub allowed_future_time: u64,
}

impl Default for LdpcConfig {
    fn default() -> Self {
        Self {
            block_generation_time: 36,
            sensitivity: 8,
            max_attempts: 64,
            workers: 0,
            allowed_future_time: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config = ChainConfig::from_json(r#"{"chain_id": 5, "clique": {"period": 3}}"#).unwrap();
        assert_eq!(config.chain_id, 5);
        assert_eq!(
            config.clique,
            Some(CliqueConfig {
                period: 3,
                epoch: DEFAULT_EPOCH
            })
        );
        assert!(config.ldpc.is_none());
    }

    #[test]
    fn test_ldpc_config_from_json() {
        let config =
            ChainConfig::from_json(r#"{"ldpc": {"sensitivity": 16, "workers": 2}}"#).unwrap();
        let ldpc = config.ldpc.unwrap();
        assert_eq!(ldpc.sensitivity, 16);
        assert_eq!(ldpc.workers, 2);
        assert_eq!(ldpc.block_generation_time, 36);
        assert_eq!(ldpc.max_attempts, 64);
    }
}
