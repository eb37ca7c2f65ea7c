//! Per-network parameters for extended keys, WIF and addresses.
//!
//! Networks are plain data records held in a [`NetworkRegistry`]; adding a
//! chain means adding a record, either to [`NetworkRegistry::builtin`] or
//! through [`crate::config::KeyChainConfig::networks`].

use crate::error::{KeyChainError, Result};
use serde::{Deserialize, Serialize};

/// Whether an extended key carries a private scalar or only a public point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    /// SLIP-44 coin type used at the second BIP44 level.
    pub coin_type: u32,
    #[serde(with = "hex::serde")]
    pub xprv_version: [u8; 4],
    #[serde(with = "hex::serde")]
    pub xpub_version: [u8; 4],
    pub wif_prefix: u8,
    pub address_prefix: u8,
}

impl Network {
    fn builtin(
        name: &str,
        coin_type: u32,
        xprv_version: [u8; 4],
        xpub_version: [u8; 4],
        wif_prefix: u8,
        address_prefix: u8,
    ) -> Self {
        Network {
            name: name.to_string(),
            coin_type,
            xprv_version,
            xpub_version,
            wif_prefix,
            address_prefix,
        }
    }

    pub fn version(&self, kind: KeyKind) -> [u8; 4] {
        match kind {
            KeyKind::Private => self.xprv_version,
            KeyKind::Public => self.xpub_version,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
}

impl NetworkRegistry {
    /// Empty registry; most callers want [`NetworkRegistry::builtin`].
    pub fn empty() -> Self {
        NetworkRegistry {
            networks: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        NetworkRegistry {
            networks: vec![
                // xprv / xpub
                Network::builtin(
                    "bitcoin",
                    0,
                    [0x04, 0x88, 0xAD, 0xE4],
                    [0x04, 0x88, 0xB2, 0x1E],
                    0x80,
                    0x00,
                ),
                // tprv / tpub
                Network::builtin(
                    "testnet",
                    1,
                    [0x04, 0x35, 0x83, 0x94],
                    [0x04, 0x35, 0x87, 0xCF],
                    0xEF,
                    0x6F,
                ),
                // Ltpv / Ltub
                Network::builtin(
                    "litecoin",
                    2,
                    [0x01, 0x9D, 0x9C, 0xFE],
                    [0x01, 0x9D, 0xA4, 0x62],
                    0xB0,
                    0x30,
                ),
                // ttpv / ttub
                Network::builtin(
                    "litecoin_testnet",
                    1,
                    [0x04, 0x36, 0xEF, 0x7D],
                    [0x04, 0x36, 0xF6, 0xE1],
                    0xEF,
                    0x6F,
                ),
            ],
        }
    }

    /// Adds a network. Names and extended-key version bytes must stay unique
    /// across the registry so decoding never has to guess.
    pub fn register(&mut self, network: Network) -> Result<()> {
        if network.xprv_version == network.xpub_version {
            return Err(KeyChainError::DuplicateNetwork(network.name));
        }
        let clashes = self.networks.iter().any(|known| {
            known.name == network.name
                || [known.xprv_version, known.xpub_version].iter().any(|v| {
                    *v == network.xprv_version || *v == network.xpub_version
                })
        });
        if clashes {
            return Err(KeyChainError::DuplicateNetwork(network.name));
        }
        tracing::debug!(network = %network.name, "registered network");
        self.networks.push(network);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Network> {
        self.networks
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| KeyChainError::UnknownNetwork(name.to_string()))
    }

    /// Identifies the network and key kind from extended-key version bytes.
    pub fn by_version(&self, version: [u8; 4]) -> Result<(&Network, KeyKind)> {
        self.networks
            .iter()
            .find_map(|n| {
                if n.xprv_version == version {
                    Some((n, KeyKind::Private))
                } else if n.xpub_version == version {
                    Some((n, KeyKind::Public))
                } else {
                    None
                }
            })
            .ok_or_else(|| KeyChainError::UnknownVersionBytes(version.to_vec()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.iter()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
