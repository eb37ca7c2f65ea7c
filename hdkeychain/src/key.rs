use crate::{
    derivation::{ChildIndex, DerivationPath},
    error::{KeyChainError, Result},
    network::Network,
};
use crypto_utils::{hash::hash160, hmac::hmac_sha512_split};
use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};

/// HMAC key for master key generation, shared by every network.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

pub const MIN_SEED_LEN: usize = 16;
pub const MAX_SEED_LEN: usize = 64;

/// A node of the key tree: an extended private or public key bound to its
/// network and, when known, its path from the wallet's `m`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyNode {
    pub(crate) network: Network,
    pub(crate) depth: u8,
    pub(crate) parent_fingerprint: [u8; 4],
    pub(crate) child_index: ChildIndex,
    pub(crate) chain_code: [u8; 32],
    pub(crate) private_key: Option<SecretKey>,
    pub(crate) public_key: PublicKey,
    pub(crate) path: Option<DerivationPath>,
}

/// 4-byte key fingerprint: HASH160(pubkey)[0..4]
pub fn fingerprint(pubkey: &PublicKey) -> [u8; 4] {
    let id = hash160(&pubkey.serialize());
    [id[0], id[1], id[2], id[3]]
}

impl KeyNode {
    /// Master extended private key from a seed
    pub fn from_seed(secp: &Secp256k1<All>, seed: &[u8], network: &Network) -> Result<Self> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(KeyChainError::InvalidSeedLength(seed.len()));
        }
        let (il, ir) = hmac_sha512_split(MASTER_HMAC_KEY, &[seed]);
        let private_key = SecretKey::from_slice(&il).map_err(|_| KeyChainError::InvalidMasterKey)?;
        Ok(KeyNode {
            network: network.clone(),
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_index: ChildIndex::Normal(0),
            chain_code: ir,
            private_key: Some(private_key),
            public_key: PublicKey::from_secret_key(secp, &private_key),
            path: Some(DerivationPath::master()),
        })
    }

    /// Child key derivation for private keys (CKDpriv)
    pub fn derive_private_child(&self, secp: &Secp256k1<All>, index: ChildIndex) -> Result<Self> {
        let parent_key = self
            .private_key
            .ok_or_else(|| KeyChainError::NoPrivateKeyMaterial {
                network: self.network.name.clone(),
                path: self.path_string(),
            })?;

        // Hardened: 0x00 || ser256(k) || ser32(i); normal: serP(K) || ser32(i)
        let index_bytes = index.raw().to_be_bytes();
        let (il, ir) = if index.is_hardened() {
            hmac_sha512_split(
                &self.chain_code,
                &[&[0u8], &parent_key.secret_bytes(), &index_bytes],
            )
        } else {
            hmac_sha512_split(
                &self.chain_code,
                &[&self.public_key.serialize(), &index_bytes],
            )
        };

        // child private key = (parent private key + IL) mod n
        let child_key = Scalar::from_be_bytes(il)
            .ok()
            .and_then(|tweak| parent_key.add_tweak(&tweak).ok())
            .ok_or_else(|| self.invalid_child(index))?;

        self.child(index, ir, Some(child_key), PublicKey::from_secret_key(secp, &child_key))
    }

    /// Child key derivation for public keys (CKDpub); normal indices only.
    pub fn derive_public_child(&self, secp: &Secp256k1<All>, index: ChildIndex) -> Result<Self> {
        if index.is_hardened() {
            return Err(KeyChainError::HardenedFromPublic {
                network: self.network.name.clone(),
                path: self.path_string(),
                index: index.raw(),
            });
        }
        let (il, ir) = hmac_sha512_split(
            &self.chain_code,
            &[&self.public_key.serialize(), &index.raw().to_be_bytes()],
        );

        // child public key = parent public key + IL·G
        let child_point = Scalar::from_be_bytes(il)
            .ok()
            .and_then(|tweak| self.public_key.add_exp_tweak(secp, &tweak).ok())
            .ok_or_else(|| self.invalid_child(index))?;

        self.child(index, ir, None, child_point)
    }

    /// Derives privately when this node holds a private scalar, publicly otherwise.
    pub fn derive_child(&self, secp: &Secp256k1<All>, index: ChildIndex) -> Result<Self> {
        if self.private_key.is_some() {
            self.derive_private_child(secp, index)
        } else {
            self.derive_public_child(secp, index)
        }
    }

    fn child(
        &self,
        index: ChildIndex,
        chain_code: [u8; 32],
        private_key: Option<SecretKey>,
        public_key: PublicKey,
    ) -> Result<Self> {
        let depth = self.depth.checked_add(1).ok_or(KeyChainError::DepthOverflow)?;
        Ok(KeyNode {
            network: self.network.clone(),
            depth,
            parent_fingerprint: fingerprint(&self.public_key),
            child_index: index,
            chain_code,
            private_key,
            public_key,
            path: self.path.as_ref().map(|p| p.child(index)),
        })
    }

    fn invalid_child(&self, index: ChildIndex) -> KeyChainError {
        KeyChainError::InvalidChildKey {
            path: self.path_string(),
            index: index.raw(),
        }
    }

    /// Watch-only copy of this node.
    pub fn neuter(&self) -> Self {
        KeyNode {
            private_key: None,
            ..self.clone()
        }
    }

    /// Records where this node sits in its wallet. The path length must match
    /// the depth and its last step the child index.
    pub fn with_path(mut self, path: DerivationPath) -> Result<Self> {
        let consistent = path.len() == usize::from(self.depth)
            && path.last().is_none_or(|last| last == self.child_index);
        if !consistent {
            return Err(KeyChainError::MalformedPath {
                path: path.to_string(),
                reason: "path does not match key depth and child index",
            });
        }
        self.path = Some(path);
        Ok(self)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_index(&self) -> ChildIndex {
        self.child_index
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn private_key(&self) -> Option<&SecretKey> {
        self.private_key.as_ref()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn is_private(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&self.public_key)
    }

    pub fn path(&self) -> Option<&DerivationPath> {
        self.path.as_ref()
    }

    /// Path for messages; nodes decoded without placement show their depth.
    pub(crate) fn path_string(&self) -> String {
        match &self.path {
            Some(path) => path.to_string(),
            None => format!("<depth {} key>", self.depth),
        }
    }
}
