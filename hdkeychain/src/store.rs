//! Persistence seam for wallets, derived keys and chain counters.
//!
//! Key nodes live in an arena addressed by [`KeyId`]; children refer to their
//! parents only through the 4-byte fingerprint, never by reference.

use crate::{
    derivation::DerivationPath,
    error::{KeyChainError, Result},
    key::KeyNode,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Opaque arena handle of a stored key node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletRecord {
    pub name: String,
    pub network: String,
    pub root: KeyId,
}

/// Identifies one counter: the chain node whose children are issued, for
/// example `m/44'/0'/0'/0` for the receiving branch of account 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChainKey {
    pub wallet: String,
    pub chain: DerivationPath,
}

/// Storage collaborator of the key-tree manager.
///
/// `issue_index` is the only way to advance a chain counter: it hands the
/// current index to `derive` under the chain's lock and moves the counter
/// forward only when `derive` succeeds. The issued key is stored under `name`
/// when one is given.
pub trait KeyStore: Send + Sync {
    fn insert_wallet(&self, record: WalletRecord) -> Result<()>;
    fn load_wallet(&self, name: &str) -> Result<WalletRecord>;
    fn wallet_names(&self) -> Result<Vec<String>>;

    /// Stores `node` for `wallet`, or returns the id already stored at the
    /// node's path.
    fn put_key(&self, wallet: &str, node: KeyNode) -> Result<KeyId>;
    fn key(&self, id: KeyId) -> Result<KeyNode>;
    fn key_name(&self, id: KeyId) -> Result<Option<String>>;
    fn key_at(&self, wallet: &str, path: &DerivationPath) -> Result<Option<KeyId>>;
    fn wallet_keys(&self, wallet: &str) -> Result<Vec<KeyId>>;

    fn put_account(&self, wallet: &str, account: u32, id: KeyId) -> Result<()>;
    fn account(&self, wallet: &str, account: u32) -> Result<Option<KeyId>>;

    fn next_index(&self, chain: &ChainKey) -> Result<u32>;
    fn issue_index(
        &self,
        chain: &ChainKey,
        name: Option<&str>,
        derive: &mut dyn FnMut(u32) -> Result<KeyNode>,
    ) -> Result<(KeyId, KeyNode)>;
}

struct Slot {
    wallet: String,
    name: Option<String>,
    node: KeyNode,
}

#[derive(Default)]
struct Arena {
    wallets: HashMap<String, WalletRecord>,
    wallet_order: Vec<String>,
    nodes: Vec<Slot>,
    by_path: HashMap<(String, DerivationPath), KeyId>,
    accounts: HashMap<(String, u32), KeyId>,
}

/// In-process store. Counters have their own locks so issuing on one chain
/// never waits on another.
#[derive(Default)]
pub struct MemoryStore {
    arena: Mutex<Arena>,
    counters: Mutex<HashMap<ChainKey, Arc<Mutex<u32>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| KeyChainError::Store("lock poisoned".to_string()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, chain: &ChainKey) -> Result<Arc<Mutex<u32>>> {
        let mut counters = lock(&self.counters)?;
        Ok(counters.entry(chain.clone()).or_default().clone())
    }

    fn store_key(&self, wallet: &str, name: Option<&str>, node: KeyNode) -> Result<KeyId> {
        let path = node.path().cloned().ok_or_else(|| {
            KeyChainError::Store(format!("refusing to store an unplaced key for {wallet:?}"))
        })?;
        let mut arena = lock(&self.arena)?;
        let key = (wallet.to_string(), path);
        if let Some(&id) = arena.by_path.get(&key) {
            if let Some(name) = name {
                arena.nodes[id.0].name = Some(name.to_string());
            }
            return Ok(id);
        }
        let id = KeyId(arena.nodes.len());
        arena.nodes.push(Slot {
            wallet: wallet.to_string(),
            name: name.map(str::to_string),
            node,
        });
        arena.by_path.insert(key, id);
        Ok(id)
    }

    fn slot<T>(&self, id: KeyId, read: impl FnOnce(&Slot) -> T) -> Result<T> {
        lock(&self.arena)?
            .nodes
            .get(id.0)
            .map(read)
            .ok_or_else(|| KeyChainError::Store(format!("no key with id {}", id.0)))
    }
}

impl KeyStore for MemoryStore {
    fn insert_wallet(&self, record: WalletRecord) -> Result<()> {
        let mut arena = lock(&self.arena)?;
        if arena.wallets.contains_key(&record.name) {
            return Err(KeyChainError::WalletExists(record.name));
        }
        arena.wallet_order.push(record.name.clone());
        arena.wallets.insert(record.name.clone(), record);
        Ok(())
    }

    fn load_wallet(&self, name: &str) -> Result<WalletRecord> {
        lock(&self.arena)?
            .wallets
            .get(name)
            .cloned()
            .ok_or_else(|| KeyChainError::WalletNotFound(name.to_string()))
    }

    fn wallet_names(&self) -> Result<Vec<String>> {
        Ok(lock(&self.arena)?.wallet_order.clone())
    }

    fn put_key(&self, wallet: &str, node: KeyNode) -> Result<KeyId> {
        self.store_key(wallet, None, node)
    }

    fn key(&self, id: KeyId) -> Result<KeyNode> {
        self.slot(id, |slot| slot.node.clone())
    }

    fn key_name(&self, id: KeyId) -> Result<Option<String>> {
        self.slot(id, |slot| slot.name.clone())
    }

    fn key_at(&self, wallet: &str, path: &DerivationPath) -> Result<Option<KeyId>> {
        let arena = lock(&self.arena)?;
        Ok(arena
            .by_path
            .get(&(wallet.to_string(), path.clone()))
            .copied())
    }

    fn wallet_keys(&self, wallet: &str) -> Result<Vec<KeyId>> {
        let arena = lock(&self.arena)?;
        Ok(arena
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.wallet == wallet)
            .map(|(i, _)| KeyId(i))
            .collect())
    }

    fn put_account(&self, wallet: &str, account: u32, id: KeyId) -> Result<()> {
        lock(&self.arena)?
            .accounts
            .insert((wallet.to_string(), account), id);
        Ok(())
    }

    fn account(&self, wallet: &str, account: u32) -> Result<Option<KeyId>> {
        Ok(lock(&self.arena)?
            .accounts
            .get(&(wallet.to_string(), account))
            .copied())
    }

    fn next_index(&self, chain: &ChainKey) -> Result<u32> {
        let counter = self.counter(chain)?;
        let next = *lock(&counter)?;
        Ok(next)
    }

    fn issue_index(
        &self,
        chain: &ChainKey,
        name: Option<&str>,
        derive: &mut dyn FnMut(u32) -> Result<KeyNode>,
    ) -> Result<(KeyId, KeyNode)> {
        let counter = self.counter(chain)?;
        let mut next = lock(&counter)?;
        let node = derive(*next)?;
        let id = self.store_key(&chain.wallet, name, node.clone())?;
        *next += 1;
        Ok((id, node))
    }
}
