pub mod bip44;
pub mod codec;
pub mod config;
pub mod derivation;
pub mod error;
pub mod key;
pub mod logging;
pub mod manager;
pub mod network;
pub mod store;

pub use bip44::Branch;
pub use config::KeyChainConfig;
pub use derivation::{ChildIndex, DerivationPath};
pub use error::{KeyChainError, Result};
pub use key::KeyNode;
pub use logging::init_logging;
pub use manager::{Account, KeyTreeManager, RootSource, StoredKey, Wallet};
pub use network::{KeyKind, Network, NetworkRegistry};
pub use store::{ChainKey, KeyId, KeyStore, MemoryStore};
