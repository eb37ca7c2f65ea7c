use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyChainError {
    #[error("malformed derivation path {path:?}: {reason}")]
    MalformedPath { path: String, reason: &'static str },

    #[error("extended key checksum mismatch")]
    ChecksumMismatch,

    #[error("unknown version bytes {}", hex::encode(.0))]
    UnknownVersionBytes(Vec<u8>),

    #[error("unknown network {0:?}")]
    UnknownNetwork(String),

    #[error("cannot derive hardened child {index} from a public-only key on {network} at {path}")]
    HardenedFromPublic {
        network: String,
        path: String,
        index: u32,
    },

    #[error("key on {network} at {path} holds no private key material")]
    NoPrivateKeyMaterial { network: String, path: String },

    #[error("wallet {wallet:?} needs a private key to derive {path}")]
    RequiresPrivateKey { wallet: String, path: String },

    #[error("child indices exhausted for wallet {wallet:?} at {path}")]
    IndexExhausted { wallet: String, path: String },

    #[error("invalid base58 character {0:?}")]
    InvalidBase58(char),

    #[error("invalid payload length {0}")]
    InvalidLength(usize),

    #[error("invalid key data")]
    InvalidKeyData,

    #[error("depth 0 key must have zero parent fingerprint and child index")]
    InvalidRootFields,

    #[error("seed must be 16 to 64 bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("seed produced an invalid master key")]
    InvalidMasterKey,

    #[error("child {index} of {path} is not a valid key")]
    InvalidChildKey { path: String, index: u32 },

    #[error("key depth exceeds 255")]
    DepthOverflow,

    #[error("network {0:?} conflicts with a registered network")]
    DuplicateNetwork(String),

    #[error("expected a key for {expected}, found one for {found}")]
    NetworkMismatch { expected: String, found: String },

    #[error("wallet {0:?} already exists")]
    WalletExists(String),

    #[error("wallet {0:?} not found")]
    WalletNotFound(String),

    #[error("{path} is outside wallet {wallet:?} rooted at {root}")]
    OutsideImportedSubtree {
        wallet: String,
        root: String,
        path: String,
    },

    #[error("cannot place an imported key of depth {0} without an explicit path")]
    UnsupportedImportDepth(u8),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("key store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, KeyChainError>;

impl From<crypto_utils::Base58Error> for KeyChainError {
    fn from(err: crypto_utils::Base58Error) -> Self {
        use crypto_utils::Base58Error;
        match err {
            Base58Error::InvalidCharacter(c) => KeyChainError::InvalidBase58(c),
            Base58Error::TooShort(len) => KeyChainError::InvalidLength(len),
            Base58Error::InvalidChecksum => KeyChainError::ChecksumMismatch,
        }
    }
}
