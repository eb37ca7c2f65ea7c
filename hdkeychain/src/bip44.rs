//! BIP44 layout: `m / purpose' / coin_type' / account' / change / address_index`.

use crate::{
    derivation::{ChildIndex, DerivationPath},
    error::{KeyChainError, Result},
};
use std::fmt;

pub const DEFAULT_PURPOSE: u32 = 44;

/// Depth of an account node below `m`.
pub const ACCOUNT_DEPTH: u8 = 3;

/// Depth of an address leaf below `m`.
pub const ADDRESS_DEPTH: u8 = 5;

/// The two standing chains under every account.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    /// Receiving addresses, change = 0.
    External,
    /// Change addresses, change = 1.
    Change,
}

impl Branch {
    pub fn index(self) -> ChildIndex {
        match self {
            Branch::External => ChildIndex::Normal(0),
            Branch::Change => ChildIndex::Normal(1),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::External => write!(f, "external"),
            Branch::Change => write!(f, "change"),
        }
    }
}

pub fn account_path(purpose: u32, coin_type: u32, account: u32) -> Result<DerivationPath> {
    Ok(DerivationPath::from(vec![
        ChildIndex::hardened(purpose)?,
        ChildIndex::hardened(coin_type)?,
        ChildIndex::hardened(account)?,
    ]))
}

pub fn leaf_path(
    purpose: u32,
    coin_type: u32,
    account: u32,
    branch: Branch,
    index: u32,
) -> Result<DerivationPath> {
    Ok(account_path(purpose, coin_type, account)?
        .child(branch.index())
        .child(ChildIndex::normal(index)?))
}

/// Account number encoded in a path at or below the account level.
pub fn account_of(path: &DerivationPath) -> Option<u32> {
    match path.steps().get(usize::from(ACCOUNT_DEPTH) - 1) {
        Some(ChildIndex::Hardened(account)) => Some(*account),
        _ => None,
    }
}

/// Places a key imported at `depth` in the BIP44 tree. Levels above the key
/// come from the template, with `account_id` (default 0) at the account
/// level; the key's own level is its child index.
pub fn template_path(
    purpose: u32,
    coin_type: u32,
    depth: u8,
    child_index: ChildIndex,
    account_id: Option<u32>,
) -> Result<DerivationPath> {
    if depth > ADDRESS_DEPTH {
        return Err(KeyChainError::UnsupportedImportDepth(depth));
    }
    if depth == 0 {
        return Ok(DerivationPath::master());
    }
    let template = [
        ChildIndex::hardened(purpose)?,
        ChildIndex::hardened(coin_type)?,
        ChildIndex::hardened(account_id.unwrap_or(0))?,
        Branch::External.index(),
    ];
    let mut steps: Vec<ChildIndex> = template[..usize::from(depth) - 1].to_vec();
    steps.push(child_index);
    Ok(DerivationPath::from(steps))
}
