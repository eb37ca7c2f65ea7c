//! Text encodings of key nodes: extended keys, WIF and P2PKH addresses.
//!
//! Extended keys serialize as
//! `version(4) | depth(1) | parent_fp(4) | child_index(4) | chain_code(32) | key_data(33)`
//! followed by a 4-byte sha256d checksum, all Base58Check encoded.

use crate::{
    derivation::{ChildIndex, DerivationPath},
    error::{KeyChainError, Result},
    key::KeyNode,
    network::{KeyKind, Network, NetworkRegistry},
};
use crypto_utils::{base58, hash::hash160};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt::Write;

pub const EXTENDED_KEY_LEN: usize = 78;

const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Serializes `node` as an extended key string. Asking for the private form
/// of a watch-only node fails.
pub fn encode(node: &KeyNode, want_private: bool) -> Result<String> {
    if !want_private {
        return Ok(encode_public(node));
    }
    let secret = node.private_key.ok_or_else(|| no_private_key(node))?;
    let mut key_data = [0u8; 33];
    key_data[1..].copy_from_slice(&secret.secret_bytes());
    Ok(encode_payload(node, KeyKind::Private, &key_data))
}

fn encode_public(node: &KeyNode) -> String {
    encode_payload(node, KeyKind::Public, &node.public_key.serialize())
}

fn encode_payload(node: &KeyNode, kind: KeyKind, key_data: &[u8; 33]) -> String {
    let mut payload = Vec::with_capacity(EXTENDED_KEY_LEN);
    payload.extend_from_slice(&node.network.version(kind));
    payload.push(node.depth);
    payload.extend_from_slice(&node.parent_fingerprint);
    payload.extend_from_slice(&node.child_index.raw().to_be_bytes());
    payload.extend_from_slice(&node.chain_code);
    payload.extend_from_slice(key_data);
    base58::encode_check(&payload)
}

/// Parses an extended key string. The network is identified from the
/// version bytes; the resulting node has no path unless it is a root.
pub fn decode(registry: &NetworkRegistry, s: &str) -> Result<KeyNode> {
    let data = base58::decode_check(s)?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(KeyChainError::InvalidLength(data.len()));
    }
    let version = [data[0], data[1], data[2], data[3]];
    let (network, kind) = registry.by_version(version)?;

    let depth = data[4];
    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&data[5..9]);
    let child_index = ChildIndex::from_raw(u32::from_be_bytes([
        data[9], data[10], data[11], data[12],
    ]));
    if depth == 0 && (parent_fingerprint != [0u8; 4] || child_index.raw() != 0) {
        return Err(KeyChainError::InvalidRootFields);
    }
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);

    let key_data = &data[45..78];
    let secp = Secp256k1::signing_only();
    let (private_key, public_key) = match kind {
        KeyKind::Private => {
            if key_data[0] != 0 {
                return Err(KeyChainError::InvalidKeyData);
            }
            let secret =
                SecretKey::from_slice(&key_data[1..]).map_err(|_| KeyChainError::InvalidKeyData)?;
            (Some(secret), PublicKey::from_secret_key(&secp, &secret))
        }
        KeyKind::Public => {
            let point = PublicKey::from_slice(key_data).map_err(|_| KeyChainError::InvalidKeyData)?;
            (None, point)
        }
    };

    Ok(KeyNode {
        network: network.clone(),
        depth,
        parent_fingerprint,
        child_index,
        chain_code,
        private_key,
        public_key,
        path: (depth == 0).then(DerivationPath::master),
    })
}

/// Wallet Import Format: `prefix | scalar(32) [| 0x01] | checksum`.
pub fn encode_wif(node: &KeyNode, compressed: bool) -> Result<String> {
    let secret = node.private_key.ok_or_else(|| no_private_key(node))?;
    let mut payload = Vec::with_capacity(34);
    payload.push(node.network.wif_prefix);
    payload.extend_from_slice(&secret.secret_bytes());
    if compressed {
        payload.push(WIF_COMPRESSED_FLAG);
    }
    Ok(base58::encode_check(&payload))
}

/// Parses a WIF string for `network`, returning the scalar and whether it
/// marks a compressed public key.
pub fn decode_wif(network: &Network, s: &str) -> Result<(SecretKey, bool)> {
    let data = base58::decode_check(s)?;
    let compressed = match data.len() {
        33 => false,
        34 if data[33] == WIF_COMPRESSED_FLAG => true,
        34 => return Err(KeyChainError::InvalidKeyData),
        len => return Err(KeyChainError::InvalidLength(len)),
    };
    if data[0] != network.wif_prefix {
        return Err(KeyChainError::UnknownVersionBytes(vec![data[0]]));
    }
    let secret = SecretKey::from_slice(&data[1..33]).map_err(|_| KeyChainError::InvalidKeyData)?;
    Ok((secret, compressed))
}

/// Pay-to-pubkey-hash address of the node's compressed public key.
pub fn address(node: &KeyNode) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(node.network.address_prefix);
    payload.extend_from_slice(&hash160(&node.public_key.serialize()));
    base58::encode_check(&payload)
}

fn no_private_key(node: &KeyNode) -> KeyChainError {
    KeyChainError::NoPrivateKeyMaterial {
        network: node.network.name.clone(),
        path: node.path_string(),
    }
}

impl KeyNode {
    /// Extended private key string (xprv, tprv, Ltpv, ...).
    pub fn extended_private(&self) -> Result<String> {
        encode(self, true)
    }

    /// Extended public key string (xpub, tpub, Ltub, ...).
    pub fn extended_public(&self) -> String {
        encode_public(self)
    }

    /// The private extended key when available, the public one otherwise.
    pub fn extended_key(&self) -> String {
        self.extended_private()
            .unwrap_or_else(|_| self.extended_public())
    }

    /// Compressed WIF of the private scalar.
    pub fn wif(&self) -> Result<String> {
        encode_wif(self, true)
    }

    pub fn address(&self) -> String {
        address(self)
    }

    /// Human-readable summary. Only public material is printed.
    pub fn info(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "network:            {}", self.network.name);
        let _ = writeln!(out, "path:               {}", self.path_string());
        let _ = writeln!(out, "depth:              {}", self.depth);
        let _ = writeln!(out, "child index:        {}", self.child_index);
        let _ = writeln!(out, "parent fingerprint: {}", hex::encode(self.parent_fingerprint));
        let _ = writeln!(out, "fingerprint:        {}", hex::encode(self.fingerprint()));
        let _ = writeln!(out, "private key:        {}", if self.is_private() { "yes" } else { "no" });
        let _ = writeln!(out, "extended public:    {}", self.extended_public());
        let _ = writeln!(out, "address:            {}", self.address());
        out
    }
}
