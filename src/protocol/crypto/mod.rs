//! Cryptographic identity and pairing primitives

#[allow(missing_docs)]
mod error;
mod gcm;
mod identity;
mod keystore;
mod spake2;
mod tls;

#[cfg(test)]
mod tests;

pub use self::error::{CryptoError, StorageError};
pub use self::gcm::{Aes128Gcm, Aes256Gcm};
pub use self::identity::{AdbIdentity, CompatibleOsRng, MODULUS_BITS, MODULUS_BYTES};
pub use self::keystore::{
    decode_record, encode_record, unwrap_private_key, wrap_private_key, FilePreferences,
    FileWrappingKey, MemoryPreferences, PreferenceStore, StaticWrappingKey, WrappingKeyProvider,
    KEY_RECORD,
};
pub use self::spake2::{PairingCipher, Spake2Context, Spake2Role, MESSAGE_LEN};
pub use self::tls::{export_keying_material, TlsIdentity, EXPORT_LABEL, EXPORT_LEN};

/// Length of various cryptographic values
pub mod lengths {
    /// AES-128 key length
    pub const AES_128_KEY: usize = 16;
    /// AES-256 key length
    pub const AES_256_KEY: usize = 32;
    /// AES-GCM nonce length
    pub const AES_GCM_NONCE: usize = 12;
    /// AES-GCM tag length
    pub const AES_GCM_TAG: usize = 16;
    /// AUTH challenge token length
    pub const AUTH_TOKEN: usize = 20;
}
