//! SPAKE2 over P-256 for wireless-debugging pairing.
//!
//! Parameter set: P-256 group with the RFC 9382 `M`/`N` blinding points,
//! HKDF-SHA256 for key derivation, AES-128-GCM for the record cipher. The
//! password is the pairing code concatenated with the TLS exported keying
//! material, so a mismatched code surfaces as an AEAD failure on the first
//! encrypted record rather than as a handshake error.

use super::gcm::Aes128Gcm;
use super::CryptoError;
use hkdf::Hkdf;
use p256::elliptic_curve::bigint::U256;
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::Field;
use p256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

/// Uncompressed SEC1 point length (the SPAKE2 message).
pub const MESSAGE_LEN: usize = 65;

/// Identity string mixed into the transcript for the client role.
const CLIENT_IDENTITY: &[u8] = b"adb pairing client";

/// Identity string mixed into the transcript for the server role.
const SERVER_IDENTITY: &[u8] = b"adb pairing server";

/// HKDF info for the record cipher key.
const CIPHER_INFO: &[u8] = b"adb pairing key";

/// RFC 9382 P-256 point M (compressed SEC1).
const M_BYTES: [u8; 33] = [
    0x02, 0x88, 0x6e, 0x2f, 0x97, 0xac, 0xe4, 0x6e, 0x55, 0xba, 0x9d, 0xd7, 0x24, 0x25, 0x79,
    0xf2, 0x99, 0x3b, 0x64, 0xe1, 0x6e, 0xf3, 0xdc, 0xab, 0x95, 0xaf, 0xd4, 0x97, 0x33, 0x3d,
    0x8f, 0xa1, 0x2f,
];

/// RFC 9382 P-256 point N (compressed SEC1).
const N_BYTES: [u8; 33] = [
    0x03, 0xd8, 0xbb, 0xd6, 0xc6, 0x39, 0xc6, 0x29, 0x37, 0xb0, 0x4d, 0x99, 0x7f, 0x38, 0xc3,
    0x77, 0x07, 0x19, 0xc6, 0x29, 0xd7, 0x01, 0x4d, 0x49, 0xa2, 0x4b, 0x4f, 0x98, 0xba, 0xa1,
    0x29, 0x2b, 0x49,
];

/// Which side of the exchange this context plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spake2Role {
    /// The pairing client (initiates, sends its message first)
    Client,
    /// The device daemon (the in-crate mock uses this)
    Server,
}

/// One SPAKE2 exchange: generates our blinded message, then derives the
/// shared secret from the peer's.
pub struct Spake2Context {
    role: Spake2Role,
    w: Scalar,
    x: Scalar,
    our_message: [u8; MESSAGE_LEN],
}

impl Spake2Context {
    /// Create a context for `role` keyed on `password`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoint` if the fixed blinding points fail to decode
    /// (compile-time constants; cannot happen on a correct build).
    pub fn new(role: Spake2Role, password: &[u8]) -> Result<Self, CryptoError> {
        let w = password_scalar(password);
        let x = Scalar::random(&mut rand::rngs::OsRng);

        let mask = match role {
            Spake2Role::Client => decode_point(&M_BYTES)?,
            Spake2Role::Server => decode_point(&N_BYTES)?,
        };

        let point = ProjectivePoint::GENERATOR * x + mask * w;
        let encoded = point.to_affine().to_encoded_point(false);
        let mut our_message = [0u8; MESSAGE_LEN];
        our_message.copy_from_slice(encoded.as_bytes());

        Ok(Self {
            role,
            w,
            x,
            our_message,
        })
    }

    /// Our blinded group element, to be framed and sent to the peer.
    #[must_use]
    pub fn our_message(&self) -> &[u8; MESSAGE_LEN] {
        &self.our_message
    }

    /// Consume the peer's blinded element and derive the record cipher.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoint` when the peer message is not a valid
    /// non-identity curve point.
    pub fn derive_cipher(&self, peer_message: &[u8]) -> Result<PairingCipher, CryptoError> {
        let peer = decode_peer(peer_message)?;

        let peer_mask = match self.role {
            Spake2Role::Client => decode_point(&N_BYTES)?,
            Spake2Role::Server => decode_point(&M_BYTES)?,
        };

        let shared = (peer - peer_mask * self.w) * self.x;
        if shared == ProjectivePoint::IDENTITY {
            return Err(CryptoError::InvalidPoint);
        }
        let shared_bytes = shared.to_affine().to_encoded_point(false);

        // Transcript: client message first regardless of our role.
        let (client_msg, server_msg): (&[u8], &[u8]) = match self.role {
            Spake2Role::Client => (&self.our_message, peer_message),
            Spake2Role::Server => (peer_message, &self.our_message),
        };

        let mut transcript = Sha256::new();
        append_record(&mut transcript, CLIENT_IDENTITY);
        append_record(&mut transcript, SERVER_IDENTITY);
        append_record(&mut transcript, client_msg);
        append_record(&mut transcript, server_msg);
        append_record(&mut transcript, shared_bytes.as_bytes());
        append_record(&mut transcript, self.w.to_bytes().as_slice());
        let secret: [u8; 32] = transcript.finalize().into();

        PairingCipher::from_secret(&secret)
    }
}

/// AES-128-GCM record cipher with per-direction counter nonces.
pub struct PairingCipher {
    cipher: Aes128Gcm,
    encrypt_counter: u64,
    decrypt_counter: u64,
}

impl PairingCipher {
    fn from_secret(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(None, secret);
        let mut key = [0u8; 16];
        hkdf.expand(CIPHER_INFO, &mut key)
            .map_err(|_| CryptoError::KeyDerivationFailed("HKDF expand failed".into()))?;

        Ok(Self {
            cipher: Aes128Gcm::new(&key)?,
            encrypt_counter: 0,
            decrypt_counter: 0,
        })
    }

    /// Encrypt one record. Nonce = send counter, little-endian, in the
    /// first 8 bytes of a zeroed 12-byte block.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionFailed` on AEAD failure.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = counter_nonce(self.encrypt_counter);
        self.encrypt_counter += 1;
        self.cipher.encrypt(&nonce, plaintext)
    }

    /// Decrypt one record with the receive counter.
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` when the tag does not verify — during
    /// pairing this is the signal that the codes did not match.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = counter_nonce(self.decrypt_counter);
        self.decrypt_counter += 1;
        self.cipher.decrypt(&nonce, ciphertext)
    }
}

fn counter_nonce(counter: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..8].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// Hash the password into a scalar: SHA-256 reduced modulo the group order.
fn password_scalar(password: &[u8]) -> Scalar {
    let digest = Sha256::digest(password);
    let wide = U256::from_be_slice(&digest);
    <Scalar as Reduce<U256>>::reduce(wide)
}

fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidPoint)?;
    let affine: AffinePoint =
        Option::from(AffinePoint::from_encoded_point(&encoded)).ok_or(CryptoError::InvalidPoint)?;
    Ok(ProjectivePoint::from(affine))
}

fn decode_peer(bytes: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    if bytes.len() != MESSAGE_LEN {
        return Err(CryptoError::InvalidPoint);
    }
    let point = decode_point(bytes)?;
    if point == ProjectivePoint::IDENTITY {
        return Err(CryptoError::InvalidPoint);
    }
    Ok(point)
}

/// Length-prefixed transcript append (8-byte little-endian length).
fn append_record(hasher: &mut Sha256, record: &[u8]) {
    hasher.update((record.len() as u64).to_le_bytes());
    hasher.update(record);
}
