use crate::hash::{CHECKSUM_LEN, checksum};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Base58Error {
    #[error("invalid base58 character {0:?}")]
    InvalidCharacter(char),
    #[error("base58check payload too short: {0} bytes")]
    TooShort(usize),
    #[error("base58check checksum mismatch")]
    InvalidChecksum,
}

pub const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn digit_value(c: u8) -> Option<u8> {
    BASE58_ALPHABET
        .iter()
        .position(|&a| a == c)
        .map(|pos| pos as u8)
}

pub fn encode(data: &[u8]) -> String {
    // little-endian base58 digits, grown as the carry spills over
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in data {
        let mut carry = u32::from(byte);
        for d in digits.iter_mut() {
            carry += u32::from(*d) << 8;
            *d = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n('1', zeros));
    out.extend(
        digits
            .iter()
            .rev()
            .map(|&d| BASE58_ALPHABET[usize::from(d)] as char),
    );
    out
}

pub fn decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len() * 733 / 1000 + 1);
    for c in s.chars() {
        let value = u8::try_from(c)
            .ok()
            .and_then(digit_value)
            .ok_or(Base58Error::InvalidCharacter(c))?;
        let mut carry = u32::from(value);
        for b in bytes.iter_mut() {
            carry += u32::from(*b) * 58;
            *b = carry as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push(carry as u8);
            carry >>= 8;
        }
    }

    let zeros = s.bytes().take_while(|&b| b == b'1').count();
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// Encodes `payload` followed by its 4-byte double-SHA256 checksum.
pub fn encode_check(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum(payload));
    encode(&data)
}

/// Decodes a Base58Check string and returns the payload without its checksum.
pub fn decode_check(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut data = decode(s)?;
    if data.len() < CHECKSUM_LEN {
        return Err(Base58Error::TooShort(data.len()));
    }
    let split = data.len() - CHECKSUM_LEN;
    if checksum(&data[..split]) != data[split..] {
        return Err(Base58Error::InvalidChecksum);
    }
    data.truncate(split);
    Ok(data)
}
