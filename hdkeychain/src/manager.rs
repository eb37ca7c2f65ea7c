//! Wallets, accounts and address issuance on top of the derivation engine.

use crate::{
    bip44::{self, Branch},
    codec,
    config::KeyChainConfig,
    derivation::{ChildIndex, DerivationPath, walk_steps},
    error::{KeyChainError, Result},
    key::KeyNode,
    network::{Network, NetworkRegistry},
    store::{ChainKey, KeyId, KeyStore, MemoryStore, WalletRecord},
};
use secp256k1::rand::{RngCore, thread_rng};
use secp256k1::{All, Secp256k1};
use std::fmt::{self, Write};
use tracing::{debug, info, warn};

/// Where a wallet's root key comes from.
#[derive(Clone)]
pub enum RootSource<'a> {
    /// Fresh entropy of the configured seed length.
    Random,
    Seed(&'a [u8]),
    /// An extended key string, kept at its own depth. Without `path` the key
    /// is placed in the BIP44 tree by depth, `account_id` filling the account
    /// level of keys imported below it.
    ExtendedKey {
        key: &'a str,
        account_id: Option<u32>,
        path: Option<DerivationPath>,
    },
}

impl<'a> RootSource<'a> {
    pub fn import(key: &'a str) -> Self {
        RootSource::ExtendedKey {
            key,
            account_id: None,
            path: None,
        }
    }

    pub fn import_account(key: &'a str, account_id: u32) -> Self {
        RootSource::ExtendedKey {
            key,
            account_id: Some(account_id),
            path: None,
        }
    }
}

// Seeds and extended private keys stay out of debug output.
impl fmt::Debug for RootSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSource::Random => f.write_str("Random"),
            RootSource::Seed(seed) => f
                .debug_tuple("Seed")
                .field(&format_args!("<{} bytes>", seed.len()))
                .finish(),
            RootSource::ExtendedKey {
                key,
                account_id,
                path,
            } => f
                .debug_struct("ExtendedKey")
                .field("key", &format_args!("{}...", key.get(..4).unwrap_or_default()))
                .field("account_id", account_id)
                .field("path", path)
                .finish(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    pub name: String,
    pub network: Network,
    pub main_key_id: KeyId,
    pub main_key: KeyNode,
}

impl Wallet {
    pub fn root_path(&self) -> DerivationPath {
        self.main_key.path().cloned().unwrap_or_default()
    }

    pub fn is_watch_only(&self) -> bool {
        !self.main_key.is_private()
    }

    /// Human-readable summary of the wallet and its main key. Private
    /// material is never included.
    pub fn info(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "wallet:             {}", self.name);
        let _ = writeln!(out, "root path:          {}", self.root_path());
        let _ = writeln!(out, "watch-only:         {}", self.is_watch_only());
        out.push_str(&self.main_key.info());
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub wallet: String,
    pub account_id: u32,
    pub key_id: KeyId,
    pub key: KeyNode,
}

/// A node as kept by the store, with the name it was issued under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredKey {
    pub id: KeyId,
    pub name: Option<String>,
    pub node: KeyNode,
}

fn recorded_path(node: &KeyNode) -> Result<&DerivationPath> {
    node.path()
        .ok_or_else(|| KeyChainError::Store(format!("no recorded path for {}", node.path_string())))
}

pub struct KeyTreeManager<S: KeyStore = MemoryStore> {
    config: KeyChainConfig,
    registry: NetworkRegistry,
    store: S,
    secp: Secp256k1<All>,
}

impl KeyTreeManager<MemoryStore> {
    /// Default configuration over a fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::new(KeyChainConfig::default(), MemoryStore::new())
    }
}

impl<S: KeyStore> KeyTreeManager<S> {
    pub fn new(config: KeyChainConfig, store: S) -> Result<Self> {
        let registry = config.registry()?;
        Self::with_registry(config, registry, store)
    }

    /// Uses `registry` as is; `config.networks` is ignored.
    pub fn with_registry(
        config: KeyChainConfig,
        registry: NetworkRegistry,
        store: S,
    ) -> Result<Self> {
        config.validate()?;
        registry.lookup(&config.default_network)?;
        Ok(KeyTreeManager {
            config,
            registry,
            store,
            secp: Secp256k1::new(),
        })
    }

    pub fn config(&self) -> &KeyChainConfig {
        &self.config
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_wallet(
        &self,
        name: &str,
        network: Option<&str>,
        source: RootSource<'_>,
    ) -> Result<Wallet> {
        if self.store.load_wallet(name).is_ok() {
            return Err(KeyChainError::WalletExists(name.to_string()));
        }
        let root = match source {
            RootSource::Random => {
                let mut seed = vec![0u8; self.config.seed_length];
                thread_rng().fill_bytes(&mut seed);
                self.root_from_seed(network, &seed)?
            }
            RootSource::Seed(seed) => self.root_from_seed(network, seed)?,
            RootSource::ExtendedKey {
                key,
                account_id,
                path,
            } => self.root_from_import(name, network, key, account_id, path)?,
        };

        let root_path = root.path().cloned().unwrap_or_default();
        let network = root.network().clone();
        let main_key_id = self.store.put_key(name, root.clone())?;
        self.store.insert_wallet(WalletRecord {
            name: name.to_string(),
            network: network.name.clone(),
            root: main_key_id,
        })?;
        // Only a root sitting exactly at m/purpose'/coin'/account' is an account.
        if let Some(account) = bip44::account_of(&root_path) {
            if root_path == self.account_path(&network, account)? {
                self.store.put_account(name, account, main_key_id)?;
            }
        }
        info!(
            wallet = name,
            network = %network.name,
            path = %root_path,
            watch_only = !root.is_private(),
            "created wallet"
        );
        Ok(Wallet {
            name: name.to_string(),
            network,
            main_key_id,
            main_key: root,
        })
    }

    fn root_from_seed(&self, network: Option<&str>, seed: &[u8]) -> Result<KeyNode> {
        let network = self
            .registry
            .lookup(network.unwrap_or(&self.config.default_network))?;
        KeyNode::from_seed(&self.secp, seed, network)
    }

    fn root_from_import(
        &self,
        wallet: &str,
        network: Option<&str>,
        key: &str,
        account_id: Option<u32>,
        path: Option<DerivationPath>,
    ) -> Result<KeyNode> {
        let node = codec::decode(&self.registry, key)?;
        if let Some(expected) = network {
            self.registry.lookup(expected)?;
            if expected != node.network().name {
                return Err(KeyChainError::NetworkMismatch {
                    expected: expected.to_string(),
                    found: node.network().name.clone(),
                });
            }
        }
        let path = match path {
            Some(path) => path,
            None => {
                let placed = bip44::template_path(
                    self.config.purpose,
                    node.network().coin_type,
                    node.depth(),
                    node.child_index(),
                    account_id,
                )?;
                if let Some(requested) = account_id {
                    if node.depth() == bip44::ACCOUNT_DEPTH
                        && node.child_index() != ChildIndex::Hardened(requested)
                    {
                        return Err(KeyChainError::OutsideImportedSubtree {
                            wallet: wallet.to_string(),
                            root: placed.to_string(),
                            path: self.account_path(node.network(), requested)?.to_string(),
                        });
                    }
                }
                placed
            }
        };
        node.with_path(path)
    }

    /// Reloads a wallet from the store.
    pub fn wallet(&self, name: &str) -> Result<Wallet> {
        let record = self.store.load_wallet(name)?;
        let network = self.registry.lookup(&record.network)?.clone();
        let main_key = self.store.key(record.root)?;
        Ok(Wallet {
            name: record.name,
            network,
            main_key_id: record.root,
            main_key,
        })
    }

    pub fn wallet_names(&self) -> Result<Vec<String>> {
        self.store.wallet_names()
    }

    /// Wallet summary followed by one line per stored key.
    pub fn wallet_info(&self, wallet: &Wallet) -> Result<String> {
        let mut out = wallet.info();
        let _ = writeln!(out, "keys:");
        for key in self.keys(wallet)? {
            let _ = writeln!(
                out,
                "  {:<24} {:<36} {}",
                key.node.path_string(),
                key.node.address(),
                key.name.as_deref().unwrap_or("")
            );
        }
        Ok(out)
    }

    fn account_path(&self, network: &Network, account_id: u32) -> Result<DerivationPath> {
        bip44::account_path(self.config.purpose, network.coin_type, account_id)
    }

    /// Account of a root at or below `m/purpose'/coin'/account'`, otherwise 0.
    pub fn default_account_id(&self, wallet: &Wallet) -> u32 {
        let root = wallet.root_path();
        bip44::account_of(&root)
            .filter(|&id| {
                self.account_path(&wallet.network, id)
                    .is_ok_and(|path| path.is_prefix_of(&root))
            })
            .unwrap_or(0)
    }

    /// Derives account `m/44'/coin'/account_id'`. A watch-only root above the
    /// account level cannot do this.
    pub fn new_account(&self, wallet: &Wallet, account_id: u32) -> Result<Account> {
        self.account(wallet, Some(account_id)).map_err(|err| match err {
            KeyChainError::HardenedFromPublic { .. } => KeyChainError::RequiresPrivateKey {
                wallet: wallet.name.clone(),
                path: self
                    .account_path(&wallet.network, account_id)
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            },
            other => other,
        })
    }

    /// Returns an account, deriving it on first use. `None` selects the
    /// wallet's default account.
    pub fn account(&self, wallet: &Wallet, account_id: Option<u32>) -> Result<Account> {
        let account_id = account_id.unwrap_or_else(|| self.default_account_id(wallet));
        if let Some(key_id) = self.store.account(&wallet.name, account_id)? {
            return Ok(Account {
                wallet: wallet.name.clone(),
                account_id,
                key_id,
                key: self.store.key(key_id)?,
            });
        }
        let path = self.account_path(&wallet.network, account_id)?;
        let (key_id, key) = self.node_at(wallet, &path)?;
        self.store.put_account(&wallet.name, account_id, key_id)?;
        debug!(wallet = %wallet.name, account = account_id, path = %path, "derived account");
        Ok(Account {
            wallet: wallet.name.clone(),
            account_id,
            key_id,
            key,
        })
    }

    /// Derives (and stores) the node at `path`, which must lie at or below
    /// the wallet's root.
    pub fn key_for_path(&self, wallet: &Wallet, path: &str) -> Result<KeyNode> {
        let path: DerivationPath = path.parse()?;
        self.node_at(wallet, &path).map(|(_, node)| node)
    }

    fn node_at(&self, wallet: &Wallet, path: &DerivationPath) -> Result<(KeyId, KeyNode)> {
        if let Some(id) = self.store.key_at(&wallet.name, path)? {
            return Ok((id, self.store.key(id)?));
        }
        let root_path = wallet.root_path();
        let steps = path
            .strip_prefix(&root_path)
            .ok_or_else(|| KeyChainError::OutsideImportedSubtree {
                wallet: wallet.name.clone(),
                root: root_path.to_string(),
                path: path.to_string(),
            })?;
        let node = walk_steps(&self.secp, &wallet.main_key, steps).inspect_err(|err| {
            if let KeyChainError::HardenedFromPublic { .. } = err {
                warn!(wallet = %wallet.name, path = %path, "watch-only wallet cannot derive hardened step");
            }
        })?;
        let id = self.store.put_key(&wallet.name, node.clone())?;
        Ok((id, node))
    }

    /// Issues the next unused key `.../branch/index` of `account`. Indices
    /// are never reused; a failed derivation does not consume one.
    pub fn new_key(&self, account: &Account, branch: Branch) -> Result<KeyNode> {
        self.issue_on_branch(account, branch, None).map(|key| key.node)
    }

    pub fn new_key_change(&self, account: &Account) -> Result<KeyNode> {
        self.new_key(account, Branch::Change)
    }

    /// Like [`KeyTreeManager::new_key`], storing the key under `name`.
    pub fn new_named_key(&self, account: &Account, branch: Branch, name: &str) -> Result<StoredKey> {
        self.issue_on_branch(account, branch, Some(name))
    }

    /// Issues the next unused child directly below the wallet root. This is
    /// how a root imported at the chain level (`m/44'/coin'/account'/change`)
    /// hands out addresses, having no account node of its own.
    pub fn new_root_key(&self, wallet: &Wallet) -> Result<KeyNode> {
        self.issue(&wallet.name, &wallet.main_key, None)
            .map(|key| key.node)
    }

    /// Index the next `new_key` on this branch will use.
    pub fn next_index(&self, account: &Account, branch: Branch) -> Result<u32> {
        let chain = recorded_path(&account.key)?.child(branch.index());
        self.store.next_index(&ChainKey {
            wallet: account.wallet.clone(),
            chain,
        })
    }

    /// Index the next `new_root_key` will use.
    pub fn next_root_index(&self, wallet: &Wallet) -> Result<u32> {
        self.store.next_index(&ChainKey {
            wallet: wallet.name.clone(),
            chain: recorded_path(&wallet.main_key)?.clone(),
        })
    }

    fn issue_on_branch(
        &self,
        account: &Account,
        branch: Branch,
        name: Option<&str>,
    ) -> Result<StoredKey> {
        let chain = account.key.derive_child(&self.secp, branch.index())?;
        self.issue(&account.wallet, &chain, name)
    }

    fn issue(&self, wallet: &str, chain: &KeyNode, name: Option<&str>) -> Result<StoredKey> {
        let chain_key = ChainKey {
            wallet: wallet.to_string(),
            chain: recorded_path(chain)?.clone(),
        };
        let (id, node) = self.store.issue_index(&chain_key, name, &mut |next| {
            let index = ChildIndex::normal(next).map_err(|_| KeyChainError::IndexExhausted {
                wallet: wallet.to_string(),
                path: chain_key.chain.to_string(),
            })?;
            chain.derive_child(&self.secp, index)
        })?;
        debug!(
            wallet,
            path = %node.path_string(),
            address = %node.address(),
            name = name.unwrap_or(""),
            "issued key"
        );
        Ok(StoredKey {
            id,
            name: name.map(str::to_string),
            node,
        })
    }

    /// Every stored node of the wallet in the order it was first derived.
    pub fn keys(&self, wallet: &Wallet) -> Result<Vec<StoredKey>> {
        self.store
            .wallet_keys(&wallet.name)?
            .into_iter()
            .map(|id| {
                Ok(StoredKey {
                    id,
                    name: self.store.key_name(id)?,
                    node: self.store.key(id)?,
                })
            })
            .collect()
    }

    pub fn key_by_name(&self, wallet: &Wallet, name: &str) -> Result<Option<StoredKey>> {
        Ok(self
            .keys(wallet)?
            .into_iter()
            .find(|key| key.name.as_deref() == Some(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::HARDENED_OFFSET;

    const TPRV_MASTER: &str = "tprv8ZgxMBicQKsPeWn8NtYVK5Hagad84UEPEs85EciCzf8xYWocuJovxsoNoxZAgfSrCp2xa6DdhDrzYVE8UXF75r2dKePyA7irEvBoe4aAn52";
    const TPRV_ACCOUNT_99: &str = "tprv8h4wEmfC2aSckSCYa68t8MhL7F8p9xAy322B5d6ipzY5ZWGGwksJMoajMCqd73cP4EVRygPQubgJPu9duBzPn3QV8Y7KbKUnaMzx9nnsSvh";

    fn manager() -> KeyTreeManager {
        KeyTreeManager::in_memory().unwrap()
    }

    /// Store whose counters start at the first hardened index.
    struct ExhaustedCounters(MemoryStore);

    impl KeyStore for ExhaustedCounters {
        fn insert_wallet(&self, record: WalletRecord) -> Result<()> {
            self.0.insert_wallet(record)
        }
        fn load_wallet(&self, name: &str) -> Result<WalletRecord> {
            self.0.load_wallet(name)
        }
        fn wallet_names(&self) -> Result<Vec<String>> {
            self.0.wallet_names()
        }
        fn put_key(&self, wallet: &str, node: KeyNode) -> Result<KeyId> {
            self.0.put_key(wallet, node)
        }
        fn key(&self, id: KeyId) -> Result<KeyNode> {
            self.0.key(id)
        }
        fn key_name(&self, id: KeyId) -> Result<Option<String>> {
            self.0.key_name(id)
        }
        fn key_at(&self, wallet: &str, path: &DerivationPath) -> Result<Option<KeyId>> {
            self.0.key_at(wallet, path)
        }
        fn wallet_keys(&self, wallet: &str) -> Result<Vec<KeyId>> {
            self.0.wallet_keys(wallet)
        }
        fn put_account(&self, wallet: &str, account: u32, id: KeyId) -> Result<()> {
            self.0.put_account(wallet, account, id)
        }
        fn account(&self, wallet: &str, account: u32) -> Result<Option<KeyId>> {
            self.0.account(wallet, account)
        }
        fn next_index(&self, chain: &ChainKey) -> Result<u32> {
            Ok(self.0.next_index(chain)? + HARDENED_OFFSET)
        }
        fn issue_index(
            &self,
            chain: &ChainKey,
            name: Option<&str>,
            derive: &mut dyn FnMut(u32) -> Result<KeyNode>,
        ) -> Result<(KeyId, KeyNode)> {
            self.0
                .issue_index(chain, name, &mut |next| derive(next + HARDENED_OFFSET))
        }
    }

    #[test]
    fn random_wallet_uses_default_network() {
        let manager = manager();
        let wallet = manager.create_wallet("w", None, RootSource::Random).unwrap();
        assert_eq!(wallet.network.name, "bitcoin");
        assert_eq!(wallet.main_key.depth(), 0);
        assert_eq!(wallet.root_path().to_string(), "m");
        assert!(wallet.main_key.extended_private().unwrap().starts_with("xprv"));
        assert_eq!(manager.wallet("w").unwrap(), wallet);
        assert_eq!(manager.wallet_names().unwrap(), vec!["w".to_string()]);
    }

    #[test]
    fn duplicate_wallet_names_are_rejected() {
        let manager = manager();
        manager.create_wallet("w", None, RootSource::Seed(&[1u8; 32])).unwrap();
        assert_eq!(
            manager
                .create_wallet("w", None, RootSource::Seed(&[2u8; 32]))
                .unwrap_err(),
            KeyChainError::WalletExists("w".into())
        );
        assert_eq!(
            manager.wallet("missing").unwrap_err(),
            KeyChainError::WalletNotFound("missing".into())
        );
    }

    #[test]
    fn accounts_are_idempotent() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", Some("testnet"), RootSource::Seed(&[3u8; 32]))
            .unwrap();
        let first = manager.new_account(&wallet, 7).unwrap();
        let again = manager.new_account(&wallet, 7).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.key.path().unwrap().to_string(), "m/44'/1'/7'");
        assert_eq!(first.key.depth(), 3);
    }

    #[test]
    fn issued_indices_advance_per_branch() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", None, RootSource::Seed(&[4u8; 32]))
            .unwrap();
        let account = manager.account(&wallet, None).unwrap();
        let paths: Vec<String> = (0..3)
            .map(|_| manager.new_key(&account, Branch::External).unwrap())
            .map(|k| k.path().unwrap().to_string())
            .collect();
        assert_eq!(paths, ["m/44'/0'/0'/0/0", "m/44'/0'/0'/0/1", "m/44'/0'/0'/0/2"]);
        let change = manager.new_key_change(&account).unwrap();
        assert_eq!(change.path().unwrap().to_string(), "m/44'/0'/0'/1/0");
        assert_eq!(manager.next_index(&account, Branch::External).unwrap(), 3);
        assert_eq!(manager.next_index(&account, Branch::Change).unwrap(), 1);
    }

    #[test]
    fn issued_keys_match_path_derivation() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", None, RootSource::Seed(&[5u8; 32]))
            .unwrap();
        let account = manager.new_account(&wallet, 2).unwrap();
        let issued = manager.new_key(&account, Branch::External).unwrap();
        let by_path = manager.key_for_path(&wallet, "m/44'/0'/2'/0/0").unwrap();
        assert_eq!(issued, by_path);
    }

    #[test]
    fn exhausted_branch_fails_without_consuming_an_index() {
        let manager =
            KeyTreeManager::new(KeyChainConfig::default(), ExhaustedCounters(MemoryStore::new()))
                .unwrap();
        let wallet = manager
            .create_wallet("w", None, RootSource::Seed(&[8u8; 32]))
            .unwrap();
        let account = manager.account(&wallet, None).unwrap();
        let stored_before = manager.keys(&wallet).unwrap().len();

        assert_eq!(
            manager.new_key(&account, Branch::External).unwrap_err(),
            KeyChainError::IndexExhausted {
                wallet: "w".into(),
                path: "m/44'/0'/0'/0".into(),
            }
        );
        assert!(matches!(
            manager.new_key_change(&account),
            Err(KeyChainError::IndexExhausted { .. })
        ));
        assert_eq!(
            manager.next_index(&account, Branch::External).unwrap(),
            HARDENED_OFFSET
        );
        assert_eq!(manager.keys(&wallet).unwrap().len(), stored_before);
    }

    #[test]
    fn named_keys_are_stored_with_their_name() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", Some("testnet"), RootSource::import_account(TPRV_ACCOUNT_99, 99))
            .unwrap();
        let account = manager.account(&wallet, None).unwrap();
        let change = manager
            .new_named_key(&account, Branch::Change, "change")
            .unwrap();
        assert_eq!(change.name.as_deref(), Some("change"));
        assert_eq!(change.node.path().unwrap().to_string(), "m/44'/1'/99'/1/0");
        manager.new_key(&account, Branch::External).unwrap();

        let found = manager.key_by_name(&wallet, "change").unwrap().unwrap();
        assert_eq!(found, change);
        assert_eq!(manager.key_by_name(&wallet, "missing").unwrap(), None);
        let names: Vec<Option<String>> =
            manager.keys(&wallet).unwrap().into_iter().map(|k| k.name).collect();
        assert_eq!(names, [None, Some("change".to_string()), None]);
    }

    #[test]
    fn info_never_prints_private_material() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", Some("testnet"), RootSource::import(TPRV_MASTER))
            .unwrap();
        let account = manager.new_account(&wallet, 0).unwrap();
        manager.new_named_key(&account, Branch::External, "first").unwrap();

        let summary = manager.wallet_info(&wallet).unwrap();
        assert!(summary.contains("wallet:             w"));
        assert!(summary.contains("n3UKaXBRDhTVpkvgRH7eARZFsYE989bHjw"));
        assert!(summary.contains("m/44'/1'/0'/0/0"));
        assert!(summary.contains("first"));
        assert!(!summary.contains(TPRV_MASTER));
        assert!(!summary.contains(&account.key.extended_private().unwrap()));
        assert!(wallet.info().contains(&wallet.main_key.extended_public()));
    }

    #[test]
    fn root_source_debug_hides_secrets() {
        let seed = [0xABu8; 16];
        let shown = format!("{:?}", RootSource::Seed(&seed));
        assert_eq!(shown, "Seed(<16 bytes>)");

        let shown = format!("{:?}", RootSource::import_account(TPRV_MASTER, 3));
        assert!(shown.contains("tprv..."));
        assert!(shown.contains("account_id: Some(3)"));
        assert!(!shown.contains(TPRV_MASTER));
    }

    #[test]
    fn network_argument_must_match_import() {
        let manager = manager();
        assert_eq!(
            manager
                .create_wallet("w", Some("litecoin"), RootSource::import(TPRV_MASTER))
                .unwrap_err(),
            KeyChainError::NetworkMismatch {
                expected: "litecoin".into(),
                found: "testnet".into(),
            }
        );
        assert_eq!(
            manager
                .create_wallet("w", Some("nope"), RootSource::import(TPRV_MASTER))
                .unwrap_err(),
            KeyChainError::UnknownNetwork("nope".into())
        );
        let wallet = manager
            .create_wallet("w", None, RootSource::import(TPRV_MASTER))
            .unwrap();
        assert_eq!(wallet.network.name, "testnet");
    }

    #[test]
    fn paths_outside_the_root_are_refused() {
        let manager = manager();
        let wallet = manager
            .create_wallet("w", Some("testnet"), RootSource::import_account(TPRV_ACCOUNT_99, 99))
            .unwrap();
        assert!(matches!(
            manager.new_account(&wallet, 5),
            Err(KeyChainError::OutsideImportedSubtree { .. })
        ));
        assert!(matches!(
            manager.key_for_path(&wallet, "m/44'/1'/98'/0/0"),
            Err(KeyChainError::OutsideImportedSubtree { .. })
        ));
        assert_eq!(
            manager
                .create_wallet("v", Some("testnet"), RootSource::import_account(TPRV_ACCOUNT_99, 5))
                .unwrap_err(),
            KeyChainError::OutsideImportedSubtree {
                wallet: "v".into(),
                root: "m/44'/1'/99'".into(),
                path: "m/44'/1'/5'".into(),
            }
        );
    }

    #[test]
    fn explicit_import_path() {
        let manager = manager();
        let source = RootSource::ExtendedKey {
            key: TPRV_ACCOUNT_99,
            account_id: None,
            path: Some("m/49'/1'/99'".parse().unwrap()),
        };
        let wallet = manager.create_wallet("w", None, source).unwrap();
        assert_eq!(wallet.root_path().to_string(), "m/49'/1'/99'");

        let bad = RootSource::ExtendedKey {
            key: TPRV_ACCOUNT_99,
            account_id: None,
            path: Some("m/44'/1'".parse().unwrap()),
        };
        assert!(matches!(
            manager.create_wallet("v", None, bad),
            Err(KeyChainError::MalformedPath { .. })
        ));
    }

    #[test]
    fn root_off_the_account_layout_is_not_an_account() {
        let manager = manager();
        let source = RootSource::ExtendedKey {
            key: TPRV_ACCOUNT_99,
            account_id: None,
            path: Some("m/49'/1'/99'".parse().unwrap()),
        };
        let wallet = manager.create_wallet("w", None, source).unwrap();
        assert_eq!(manager.store().account("w", 99).unwrap(), None);
        assert_eq!(manager.default_account_id(&wallet), 0);
        assert_eq!(
            manager.new_account(&wallet, 99).unwrap_err(),
            KeyChainError::OutsideImportedSubtree {
                wallet: "w".into(),
                root: "m/49'/1'/99'".into(),
                path: "m/44'/1'/99'".into(),
            }
        );
        let leaf = manager.key_for_path(&wallet, "m/49'/1'/99'/0/0").unwrap();
        assert_eq!(leaf.depth(), 5);
    }

    #[test]
    fn chain_level_root_issues_below_itself() {
        let manager = manager();
        let master = manager
            .create_wallet("master", Some("testnet"), RootSource::import(TPRV_MASTER))
            .unwrap();
        let chain_xprv = manager
            .key_for_path(&master, "m/44'/1'/0'/0")
            .unwrap()
            .extended_private()
            .unwrap();
        let wallet = manager
            .create_wallet("chain", Some("testnet"), RootSource::import(&chain_xprv))
            .unwrap();
        assert_eq!(wallet.root_path().to_string(), "m/44'/1'/0'/0");
        assert_eq!(manager.default_account_id(&wallet), 0);
        assert!(matches!(
            manager.account(&wallet, None),
            Err(KeyChainError::OutsideImportedSubtree { .. })
        ));

        let first = manager.new_root_key(&wallet).unwrap();
        let second = manager.new_root_key(&wallet).unwrap();
        assert_eq!(first.path().unwrap().to_string(), "m/44'/1'/0'/0/0");
        assert_eq!(second.path().unwrap().to_string(), "m/44'/1'/0'/0/1");
        assert_eq!(manager.next_root_index(&wallet).unwrap(), 2);

        let account = manager.new_account(&master, 0).unwrap();
        let expected = manager.new_key(&account, Branch::External).unwrap();
        assert_eq!(first.address(), expected.address());
    }

    #[test]
    fn watch_only_master_cannot_open_accounts() {
        let manager = manager();
        let tpub = "tpubD6NzVbkrYhZ4XyovGYD5iUwhFc94DoRHpAirX8kWQvwMP14PXhdX9NREz6WndqmihWbPXWKqGWqW9sBGxk9EbiubCckNn67bnt8AAGcTvw4";
        let wallet = manager
            .create_wallet("w", Some("testnet"), RootSource::import(tpub))
            .unwrap();
        assert!(wallet.is_watch_only());
        assert_eq!(
            manager.new_account(&wallet, 0).unwrap_err(),
            KeyChainError::RequiresPrivateKey {
                wallet: "w".into(),
                path: "m/44'/1'/0'".into(),
            }
        );
        assert!(matches!(
            manager.account(&wallet, None),
            Err(KeyChainError::HardenedFromPublic { .. })
        ));
        let leaf = manager.key_for_path(&wallet, "m/0/3").unwrap();
        assert!(!leaf.is_private());
        assert_eq!(leaf.depth(), 2);
    }
}
