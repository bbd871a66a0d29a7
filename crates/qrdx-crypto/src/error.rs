use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Authentication did not validate. Covers wrong keys and tampered or
    /// truncated ciphertext alike.
    #[error("authentication failed: invalid key or corrupted data")]
    Authentication,
}
