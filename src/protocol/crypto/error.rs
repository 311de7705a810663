use thiserror::Error;

/// Cryptographic failures in the identity and pairing layers
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid public key encoding")]
    InvalidPublicKey,

    #[error("point is not on the curve or is the identity")]
    InvalidPoint,

    #[error("certificate generation failed: {0}")]
    CertificateFailed(String),
}

/// Identity persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("wrapping key unavailable: {0}")]
    WrappingKeyUnavailable(String),
}
