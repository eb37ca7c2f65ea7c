//! Engine configuration.
//!
//! Values come from [`Default`], a JSON document ([`KeyChainConfig::from_json_str`],
//! [`KeyChainConfig::from_file`]) and finally environment overrides
//! ([`KeyChainConfig::with_env_overrides`]).

use crate::{
    error::{KeyChainError, Result},
    key::{MAX_SEED_LEN, MIN_SEED_LEN},
    network::{Network, NetworkRegistry},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_NETWORK: &str = "HDKEYCHAIN_NETWORK";
pub const ENV_SEED_LENGTH: &str = "HDKEYCHAIN_SEED_LENGTH";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyChainConfig {
    /// Network for wallets created from a seed without an explicit network.
    pub default_network: String,
    /// BIP44 purpose level.
    pub purpose: u32,
    /// Bytes of entropy drawn for randomly seeded wallets.
    pub seed_length: usize,
    /// Networks registered on top of the built-in table.
    pub networks: Vec<Network>,
}

impl Default for KeyChainConfig {
    fn default() -> Self {
        KeyChainConfig {
            default_network: "bitcoin".to_string(),
            purpose: crate::bip44::DEFAULT_PURPOSE,
            seed_length: 32,
            networks: Vec::new(),
        }
    }
}

impl KeyChainConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: KeyChainConfig =
            serde_json::from_str(json).map_err(|e| KeyChainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| KeyChainError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Applies `HDKEYCHAIN_NETWORK` and `HDKEYCHAIN_SEED_LENGTH` when set.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(network) = var(ENV_NETWORK) {
            self.default_network = network;
        }
        if let Some(len) = var(ENV_SEED_LENGTH) {
            self.seed_length = len
                .parse()
                .map_err(|_| KeyChainError::Config(format!("{ENV_SEED_LENGTH}={len:?} is not a number")))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&self.seed_length) {
            return Err(KeyChainError::Config(format!(
                "seed_length must be between {MIN_SEED_LEN} and {MAX_SEED_LEN}, got {}",
                self.seed_length
            )));
        }
        if self.purpose >= crate::derivation::HARDENED_OFFSET {
            return Err(KeyChainError::Config(format!("purpose {} out of range", self.purpose)));
        }
        Ok(())
    }

    /// Built-in networks plus the configured extras. The default network
    /// must resolve.
    pub fn registry(&self) -> Result<NetworkRegistry> {
        let mut registry = NetworkRegistry::builtin();
        for network in &self.networks {
            registry.register(network.clone())?;
        }
        registry.lookup(&self.default_network)?;
        Ok(registry)
    }
}
