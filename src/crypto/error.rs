use thiserror::Error;

/// Errors raised by key, hash and tweak operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Bytes do not encode a valid compressed secp256k1 point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Bytes do not encode a valid non-zero scalar
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Contract hash is not a canonical scalar, or the tweaked point is invalid
    #[error("invalid tweak")]
    InvalidTweak,

    /// Input has the wrong length
    #[error("invalid length: {len} bytes, expected: {expected} bytes")]
    InvalidLength { len: usize, expected: usize },

    /// Invalid hexadecimal string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
}
