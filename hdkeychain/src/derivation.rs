use crate::{
    error::{KeyChainError, Result},
    key::KeyNode,
};
use secp256k1::{All, Secp256k1};
use std::fmt;
use std::str::FromStr;

/// Index offset for hardened children (index >= 0x80000000) i.e., 0x80000000 = 2³¹
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// One derivation step. Normal children: 0 to 2³¹-1, hardened children carry
/// the same range with the top bit set in their raw form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildIndex {
    Normal(u32),
    Hardened(u32),
}

impl ChildIndex {
    pub fn from_raw(raw: u32) -> Self {
        if raw >= HARDENED_OFFSET {
            ChildIndex::Hardened(raw - HARDENED_OFFSET)
        } else {
            ChildIndex::Normal(raw)
        }
    }

    pub fn normal(index: u32) -> Result<Self> {
        if index >= HARDENED_OFFSET {
            return Err(KeyChainError::MalformedPath {
                path: index.to_string(),
                reason: "index must be below 2^31",
            });
        }
        Ok(ChildIndex::Normal(index))
    }

    pub fn hardened(index: u32) -> Result<Self> {
        ChildIndex::normal(index).map(|_| ChildIndex::Hardened(index))
    }

    /// The 32-bit value serialized in extended keys and fed to HMAC.
    pub fn raw(self) -> u32 {
        match self {
            ChildIndex::Normal(i) => i,
            ChildIndex::Hardened(i) => i | HARDENED_OFFSET,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            ChildIndex::Normal(i) | ChildIndex::Hardened(i) => i,
        }
    }

    pub fn is_hardened(self) -> bool {
        matches!(self, ChildIndex::Hardened(_))
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildIndex::Normal(i) => write!(f, "{i}"),
            ChildIndex::Hardened(i) => write!(f, "{i}'"),
        }
    }
}

/// A BIP-32 derivation path (e.g., "m/44'/0'/0'/0/1").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

fn parse_segment(path: &str, segment: &str) -> Result<ChildIndex> {
    let malformed = |reason| KeyChainError::MalformedPath {
        path: path.to_string(),
        reason,
    };
    let (digits, hardened) = match segment.strip_suffix('\'') {
        Some(rest) => (rest, true),
        None => (segment, false),
    };
    if digits.is_empty() {
        return Err(malformed("empty segment"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("segment is not a decimal index"));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(malformed("leading zero in segment"));
    }
    let index: u32 = digits
        .parse()
        .map_err(|_| malformed("index out of range"))?;
    if index >= HARDENED_OFFSET {
        return Err(malformed("index out of range"));
    }
    Ok(if hardened {
        ChildIndex::Hardened(index)
    } else {
        ChildIndex::Normal(index)
    })
}

impl FromStr for DerivationPath {
    type Err = KeyChainError;

    /// Parses `m` followed by `/`-separated decimal segments, each optionally
    /// suffixed with `'` for a hardened step.
    fn from_str(s: &str) -> Result<Self> {
        let rest = s.strip_prefix('m').ok_or(KeyChainError::MalformedPath {
            path: s.to_string(),
            reason: "path must start with m",
        })?;
        if rest.is_empty() {
            return Ok(DerivationPath::master());
        }
        let rest = rest.strip_prefix('/').ok_or(KeyChainError::MalformedPath {
            path: s.to_string(),
            reason: "expected / after m",
        })?;
        rest.split('/')
            .map(|segment| parse_segment(s, segment))
            .collect::<Result<Vec<_>>>()
            .map(DerivationPath)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl From<Vec<ChildIndex>> for DerivationPath {
    fn from(steps: Vec<ChildIndex>) -> Self {
        DerivationPath(steps)
    }
}

impl DerivationPath {
    pub fn master() -> Self {
        DerivationPath(Vec::new())
    }

    pub fn steps(&self) -> &[ChildIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_master(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<ChildIndex> {
        self.0.last().copied()
    }

    /// This path extended by one step.
    pub fn child(&self, step: ChildIndex) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        DerivationPath(steps)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(DerivationPath(init.to_vec()))
    }

    pub fn is_prefix_of(&self, other: &DerivationPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Steps of `self` below `prefix`, if `prefix` is an ancestor (or equal).
    pub fn strip_prefix(&self, prefix: &DerivationPath) -> Option<&[ChildIndex]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }

    /// Walks this path from `root`, deriving privately where the node holds a
    /// private scalar and publicly otherwise. Stops at the first failure.
    pub fn walk(&self, secp: &Secp256k1<All>, root: &KeyNode) -> Result<KeyNode> {
        walk_steps(secp, root, &self.0)
    }
}

/// Applies `steps` below `root` one at a time.
pub fn walk_steps(secp: &Secp256k1<All>, root: &KeyNode, steps: &[ChildIndex]) -> Result<KeyNode> {
    steps
        .iter()
        .try_fold(root.clone(), |node, &step| node.derive_child(secp, step))
}
