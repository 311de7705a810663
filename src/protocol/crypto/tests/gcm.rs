use crate::protocol::crypto::{Aes128Gcm, Aes256Gcm, CryptoError};

#[test]
fn aes128_round_trip() {
    let cipher = Aes128Gcm::new(&[7u8; 16]).unwrap();
    let nonce = [1u8; 12];

    let sealed = cipher.encrypt(&nonce, b"pairing record").unwrap();
    assert_eq!(sealed.len(), b"pairing record".len() + 16);

    let opened = cipher.decrypt(&nonce, &sealed).unwrap();
    assert_eq!(opened, b"pairing record");
}

#[test]
fn aes128_tamper_detection() {
    let cipher = Aes128Gcm::new(&[7u8; 16]).unwrap();
    let nonce = [1u8; 12];

    let mut sealed = cipher.encrypt(&nonce, b"payload").unwrap();
    sealed[0] ^= 0x80;

    assert!(matches!(
        cipher.decrypt(&nonce, &sealed),
        Err(CryptoError::DecryptionFailed(_))
    ));
}

#[test]
fn aes128_rejects_short_key() {
    assert!(matches!(
        Aes128Gcm::new(&[0u8; 12]),
        Err(CryptoError::InvalidKeyLength { expected: 16, .. })
    ));
}

#[test]
fn aes256_aad_is_authenticated() {
    let cipher = Aes256Gcm::new(&[9u8; 32]).unwrap();
    let nonce = [2u8; 12];

    let sealed = cipher
        .encrypt_with_aad(&nonce, b"adbkey\0\0\0\0\0\0\0\0\0\0", b"secret")
        .unwrap();

    // Same key and nonce, different AAD: must not open.
    assert!(cipher
        .decrypt_with_aad(&nonce, b"adbkey\0\0\0\0\0\0\0\0\0\x01", &sealed)
        .is_err());

    let opened = cipher
        .decrypt_with_aad(&nonce, b"adbkey\0\0\0\0\0\0\0\0\0\0", &sealed)
        .unwrap();
    assert_eq!(opened, b"secret");
}
