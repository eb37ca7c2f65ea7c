//! Hashing and encoding capabilities consumed by the key-tree engine.

pub mod base58;
pub mod hash;
pub mod hmac;

pub use base58::Base58Error;
