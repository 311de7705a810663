//! Process-persistent RSA signing identity.
//!
//! The daemon trusts whoever holds the private key that was provisioned
//! during pairing, so the identity is generated once and never rotated for
//! the life of the installation.

use super::keystore::{self, PreferenceStore, WrappingKeyProvider, KEY_RECORD};
use super::{CryptoError, StorageError};
use crate::error::AdbLinkError;
use base64::Engine as _;
use num_bigint::BigUint;
use num_traits::One;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha1::Sha1;
use zeroize::Zeroizing;

/// RSA modulus size in bits
pub const MODULUS_BITS: usize = 2048;
/// RSA modulus (and raw signature) size in bytes
pub const MODULUS_BYTES: usize = 256;
/// 32-bit words per modulus in the ADB public-key encoding
const WORD_COUNT: usize = MODULUS_BITS / 32;

/// The client's long-term signing identity.
pub struct AdbIdentity {
    private_key: RsaPrivateKey,
    pkcs8_der: Zeroizing<Vec<u8>>,
    name: String,
}

impl AdbIdentity {
    /// Load the identity from the preference store, or generate and persist
    /// a fresh RSA-2048 key on first run.
    ///
    /// # Errors
    ///
    /// Fails when the wrapping key cannot be obtained (fatal by design),
    /// when a stored record does not unwrap, or when key generation fails.
    pub fn load_or_create(
        store: &mut dyn PreferenceStore,
        provider: &dyn WrappingKeyProvider,
        name: &str,
    ) -> Result<Self, AdbLinkError> {
        let wrapping = provider.wrapping_key()?;

        if let Some(record) = store.get(KEY_RECORD) {
            let blob = keystore::decode_record(&record)?;
            let pkcs8 = Zeroizing::new(keystore::unwrap_private_key(&wrapping, &blob)?);
            let private_key = RsaPrivateKey::from_pkcs8_der(&pkcs8)
                .map_err(|e| StorageError::CorruptRecord(e.to_string()))?;

            tracing::debug!("loaded ADB identity from store");
            return Ok(Self {
                private_key,
                pkcs8_der: pkcs8,
                name: name.to_string(),
            });
        }

        tracing::info!("generating RSA-{MODULUS_BITS} ADB identity");
        let identity = Self::generate(name)?;

        let blob = keystore::wrap_private_key(&wrapping, &identity.pkcs8_der)?;
        store.put(KEY_RECORD, &keystore::encode_record(&blob))?;

        Ok(identity)
    }

    /// Generate a fresh identity without persisting it.
    ///
    /// # Errors
    ///
    /// Returns `KeyGenerationFailed` when the RNG or keygen fails.
    pub fn generate(name: &str) -> Result<Self, CryptoError> {
        let mut rng = CompatibleOsRng(rand::rngs::OsRng);
        let private_key = RsaPrivateKey::new(&mut rng, MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

        let pkcs8_der = Zeroizing::new(
            private_key
                .to_pkcs8_der()
                .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?
                .as_bytes()
                .to_vec(),
        );

        Ok(Self {
            private_key,
            pkcs8_der,
            name: name.to_string(),
        })
    }

    /// Rebuild an identity from its PKCS#8 encoding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPublicKey` when the DER does not parse as an RSA key.
    pub fn from_pkcs8_der(der: &[u8], name: &str) -> Result<Self, CryptoError> {
        let private_key =
            RsaPrivateKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self {
            private_key,
            pkcs8_der: Zeroizing::new(der.to_vec()),
            name: name.to_string(),
        })
    }

    /// Sign a 20-byte AUTH challenge token.
    ///
    /// The daemon expects PKCS#1 v1.5 with the SHA-1 `DigestInfo` prefix
    /// over the raw token (the token stands in for the digest), producing a
    /// 256-byte signature.
    ///
    /// # Errors
    ///
    /// Returns `SigningFailed` when the token length is not a SHA-1 digest
    /// length or the RSA operation fails.
    pub fn sign_token(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use rsa::signature::hazmat::PrehashSigner;
        use rsa::signature::SignatureEncoding;

        let signing_key = rsa::pkcs1v15::SigningKey::<Sha1>::new(self.private_key.clone());
        let signature = signing_key
            .sign_prehash(token)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        Ok(signature.to_vec())
    }

    /// The public key in the form adbd stores in `adb_keys`: a base64
    /// little-endian Montgomery word array followed by `" <name>\0"`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPublicKey` when the modulus does not fit the fixed
    /// 2048-bit layout.
    pub fn adb_public_key(&self) -> Result<Vec<u8>, CryptoError> {
        let payload = self.public_key_payload()?;

        let mut encoded = base64::engine::general_purpose::STANDARD
            .encode(&payload)
            .into_bytes();
        encoded.push(b' ');
        encoded.extend_from_slice(self.name.as_bytes());
        encoded.push(0);
        Ok(encoded)
    }

    /// The raw 524-byte word array: `[word_count, n0inv, n (LE words),
    /// rr (LE words), exponent]`.
    pub(crate) fn public_key_payload(&self) -> Result<Vec<u8>, CryptoError> {
        let public = self.private_key.to_public_key();

        let n = BigUint::from_bytes_be(&public.n().to_be_bytes());
        if n.bits() as usize > MODULUS_BITS {
            return Err(CryptoError::InvalidPublicKey);
        }

        // -(n^-1) mod 2^32, computed by Hensel lifting on the low word.
        let n0 = n.iter_u32_digits().next().ok_or(CryptoError::InvalidPublicKey)?;
        let n0inv = word_inverse(n0).wrapping_neg();

        // rr = (2^2048)^2 mod n, the Montgomery conversion factor.
        let rr = (BigUint::one() << (2 * MODULUS_BITS)) % &n;

        let exponent = uint_to_u32(&public.e().to_be_bytes())?;

        let mut payload = Vec::with_capacity(8 + 2 * MODULUS_BYTES + 4);
        #[allow(clippy::cast_possible_truncation)]
        payload.extend_from_slice(&(WORD_COUNT as u32).to_le_bytes());
        payload.extend_from_slice(&n0inv.to_le_bytes());
        payload.extend_from_slice(&le_words(&n));
        payload.extend_from_slice(&le_words(&rr));
        payload.extend_from_slice(&exponent.to_le_bytes());

        Ok(payload)
    }

    /// The PKCS#8 DER of the private key (for TLS and persistence).
    #[must_use]
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// The name label carried in the public-key suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying RSA public key (verification in tests).
    #[must_use]
    pub fn public_key(&self) -> rsa::RsaPublicKey {
        self.private_key.to_public_key()
    }
}

/// Little-endian modulus-width byte image of a big integer.
fn le_words(value: &BigUint) -> Vec<u8> {
    let mut bytes = value.to_bytes_le();
    bytes.resize(MODULUS_BYTES, 0);
    bytes
}

/// Inverse of an odd word modulo 2^32 (Hensel lifting, five rounds doubles
/// the correct low bits past 32).
fn word_inverse(n0: u32) -> u32 {
    let mut x = n0;
    for _ in 0..5 {
        x = x.wrapping_mul(2u32.wrapping_sub(n0.wrapping_mul(x)));
    }
    x
}

/// Collapse a big-endian integer image into a `u32` (the public exponent).
fn uint_to_u32(be: &[u8]) -> Result<u32, CryptoError> {
    let trimmed: Vec<u8> = be.iter().copied().skip_while(|&b| b == 0).collect();
    if trimmed.len() > 4 {
        return Err(CryptoError::InvalidPublicKey);
    }
    Ok(trimmed
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// Adapter presenting `OsRng` through the RNG traits the `rsa` crate
/// expects.
pub struct CompatibleOsRng(pub rand::rngs::OsRng);

impl rand_core_10::TryRng for CompatibleOsRng {
    type Error = core::convert::Infallible;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        use rand::RngCore;
        Ok(self.0.next_u32())
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        use rand::RngCore;
        Ok(self.0.next_u64())
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Self::Error> {
        use rand::RngCore;
        self.0.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core_10::TryCryptoRng for CompatibleOsRng {}
