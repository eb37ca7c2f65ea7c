use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of a Base58Check checksum.
pub const CHECKSUM_LEN: usize = 4;

pub fn sha256(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

/// SHA256(SHA256(input)), used for Base58Check checksums.
pub fn sha256d(input: &[u8]) -> [u8; 32] {
    sha256(&sha256(input))
}

pub fn ripemd160(input: &[u8]) -> [u8; 20] {
    Ripemd160::digest(input).into()
}

/// RIPEMD160(SHA256(input)); the key identifier behind fingerprints and
/// pay-to-pubkey-hash addresses.
pub fn hash160(input: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(input))
}

/// First four bytes of the double SHA256 of `payload`.
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha256d(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn sha256_known_values() {
        assert_eq!(
            sha256(b""),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(
            sha256(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn sha256d_known_values() {
        assert_eq!(
            sha256d(b""),
            hex!("5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456")
        );
        assert_eq!(
            sha256d(b"hello"),
            hex!("9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50")
        );
    }

    #[test]
    fn ripemd160_known_values() {
        assert_eq!(ripemd160(b""), hex!("9c1185a5c5e9fc54612808977ee8f548b2258d31"));
        assert_eq!(
            ripemd160(b"message digest"),
            hex!("5d0689ef49d2fae572b881b123a85ffa21595f36")
        );
    }

    #[test]
    fn hash160_of_generator_point() {
        // compressed secp256k1 generator, the public key of scalar 1
        let g = hex!("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
        assert_eq!(hash160(&g), hex!("751e76e8199196d454941c45d1b3a323f1433bd6"));
    }

    #[test]
    fn checksum_is_sha256d_prefix() {
        let digest = sha256d(b"hello");
        assert_eq!(checksum(b"hello"), digest[..4]);
    }
}
