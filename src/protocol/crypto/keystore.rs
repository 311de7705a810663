//! Identity persistence: a wrapped private key in a preference store.
//!
//! The PKCS#8 private key never touches disk in the clear. It is sealed with
//! AES-256-GCM under a wrapping key obtained from the platform keystore (or a
//! stand-in), IV in the first 12 bytes of the blob, 16-byte tag trailing, and
//! the literal `adbkey` zero-padded to 16 bytes as AAD.

use super::gcm::Aes256Gcm;
use super::{CryptoError, StorageError};
use base64::Engine as _;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Preference-store record holding the wrapped key, base64 no-wrap.
pub const KEY_RECORD: &str = "adbkey";

/// AAD bound into the wrap: `"adbkey"` zero-padded to 16 bytes.
const WRAP_AAD: [u8; 16] = *b"adbkey\0\0\0\0\0\0\0\0\0\0";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Source of the 32-byte wrapping key. Implementations stand in for a
/// hardware-backed keystore; failure to obtain the key is fatal for
/// identity storage.
pub trait WrappingKeyProvider: Send + Sync {
    /// Obtain the wrapping key, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `WrappingKeyUnavailable` when the backing store cannot
    /// produce a key.
    fn wrapping_key(&self) -> Result<[u8; 32], StorageError>;
}

/// File-backed wrapping key for hosts without a hardware keystore. The key
/// is generated on first use and cached behind a one-shot guard.
pub struct FileWrappingKey {
    path: std::path::PathBuf,
    cached: OnceLock<[u8; 32]>,
}

impl FileWrappingKey {
    /// Use (or create) the key file at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cached: OnceLock::new(),
        }
    }

    fn load_or_create(&self) -> Result<[u8; 32], StorageError> {
        if let Ok(bytes) = std::fs::read(&self.path) {
            let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                StorageError::CorruptRecord(format!(
                    "wrapping key file holds {} bytes, expected 32",
                    bytes.len()
                ))
            })?;
            return Ok(key);
        }

        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, key)?;
        Ok(key)
    }
}

impl WrappingKeyProvider for FileWrappingKey {
    fn wrapping_key(&self) -> Result<[u8; 32], StorageError> {
        if let Some(key) = self.cached.get() {
            return Ok(*key);
        }
        let key = self.load_or_create()?;
        Ok(*self.cached.get_or_init(|| key))
    }
}

/// Fixed wrapping key for tests.
pub struct StaticWrappingKey(pub [u8; 32]);

impl WrappingKeyProvider for StaticWrappingKey {
    fn wrapping_key(&self) -> Result<[u8; 32], StorageError> {
        Ok(self.0)
    }
}

/// Seal a PKCS#8 private key. Output layout: `IV(12) || ciphertext || tag(16)`.
///
/// # Errors
///
/// Returns an error when the wrapping key is malformed or encryption fails.
pub fn wrap_private_key(wrapping_key: &[u8; 32], pkcs8: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(wrapping_key)?;

    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let sealed = cipher.encrypt_with_aad(&iv, &WRAP_AAD, pkcs8)?;

    let mut blob = Vec::with_capacity(IV_LEN + sealed.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Open a sealed private key blob.
///
/// # Errors
///
/// Returns `DecryptionFailed` when the tag does not verify (wrong wrapping
/// key or tampered blob) and `InvalidKeyLength` when the blob is shorter
/// than IV plus tag.
pub fn unwrap_private_key(wrapping_key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: IV_LEN + TAG_LEN,
            actual: blob.len(),
        });
    }

    let cipher = Aes256Gcm::new(wrapping_key)?;
    cipher.decrypt_with_aad(&blob[..IV_LEN], &WRAP_AAD, &blob[IV_LEN..])
}

/// Abstract key-value record store for the wrapped identity.
pub trait PreferenceStore: Send + Sync {
    /// Load a record.
    fn get(&self, key: &str) -> Option<String>;

    /// Persist a record.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails
    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory preference store (non-persistent)
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    records: HashMap<String, String>,
}

impl MemoryPreferences {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.records.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file preference store
pub struct FilePreferences {
    path: std::path::PathBuf,
    cache: HashMap<String, String>,
}

impl FilePreferences {
    /// Open (or create) the store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created or an
    /// existing file does not parse.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let cache = if path.exists() {
            let file = std::fs::File::open(&path)?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .map_err(|e| StorageError::Serialization(e.to_string()))?
        } else {
            HashMap::new()
        };

        Ok(Self { path, cache })
    }

    fn save_all(&self) -> Result<(), StorageError> {
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &self.cache)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.cache.insert(key.to_string(), value.to_string());
        self.save_all()
    }
}

/// Encode a wrapped blob for the preference store.
#[must_use]
pub fn encode_record(blob: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(blob)
}

/// Decode a preference-store record back into a wrapped blob.
///
/// # Errors
///
/// Returns `CorruptRecord` when the value is not valid base64.
pub fn decode_record(value: &str) -> Result<Vec<u8>, StorageError> {
    base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| StorageError::CorruptRecord(e.to_string()))
}
