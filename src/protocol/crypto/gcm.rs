use super::{lengths, CryptoError};

/// AES-128-GCM AEAD cipher (pairing traffic)
pub struct Aes128Gcm {
    cipher: aes_gcm::Aes128Gcm,
}

impl Aes128Gcm {
    /// Create cipher with 16-byte key
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        use aes_gcm::KeyInit;

        let key_generic = aes_gcm::Key::<aes_gcm::Aes128Gcm>::try_from(key).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: lengths::AES_128_KEY,
                actual: key.len(),
            }
        })?;
        let cipher = aes_gcm::Aes128Gcm::new(&key_generic);

        Ok(Self { cipher })
    }

    /// Encrypt with 12-byte nonce
    pub fn encrypt(&self, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::Aead;

        let nonce_generic =
            aes_gcm::Nonce::try_from(nonce).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_NONCE,
                actual: nonce.len(),
            })?;

        self.cipher
            .encrypt(&nonce_generic, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Decrypt with 12-byte nonce
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::Aead;

        let nonce_generic =
            aes_gcm::Nonce::try_from(nonce).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_NONCE,
                actual: nonce.len(),
            })?;

        self.cipher
            .decrypt(&nonce_generic, ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

/// AES-256-GCM AEAD cipher (private-key wrapping)
pub struct Aes256Gcm {
    cipher: aes_gcm::Aes256Gcm,
}

impl Aes256Gcm {
    /// Create cipher with 32-byte key
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        use aes_gcm::KeyInit;

        let key_generic = aes_gcm::Key::<aes_gcm::Aes256Gcm>::try_from(key).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: lengths::AES_256_KEY,
                actual: key.len(),
            }
        })?;
        let cipher = aes_gcm::Aes256Gcm::new(&key_generic);

        Ok(Self { cipher })
    }

    /// Encrypt with additional authenticated data
    pub fn encrypt_with_aad(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::{Aead, Payload};

        let nonce_generic =
            aes_gcm::Nonce::try_from(nonce).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_NONCE,
                actual: nonce.len(),
            })?;

        self.cipher
            .encrypt(
                &nonce_generic,
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Decrypt with additional authenticated data
    pub fn decrypt_with_aad(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::{Aead, Payload};

        let nonce_generic =
            aes_gcm::Nonce::try_from(nonce).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_NONCE,
                actual: nonce.len(),
            })?;

        self.cipher
            .decrypt(
                &nonce_generic,
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
