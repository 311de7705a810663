use crate::protocol::crypto::{
    decode_record, encode_record, unwrap_private_key, wrap_private_key, FilePreferences,
    FileWrappingKey, MemoryPreferences, PreferenceStore, WrappingKeyProvider,
};

#[test]
fn wrap_layout_is_iv_ciphertext_tag() {
    let key = [3u8; 32];
    let blob = wrap_private_key(&key, b"not really pkcs8").unwrap();

    // 12-byte IV + plaintext-length ciphertext + 16-byte tag.
    assert_eq!(blob.len(), 12 + 16 + 16);
    assert_eq!(unwrap_private_key(&key, &blob).unwrap(), b"not really pkcs8");
}

#[test]
fn wrong_wrapping_key_fails_to_unwrap() {
    let blob = wrap_private_key(&[3u8; 32], b"material").unwrap();
    assert!(unwrap_private_key(&[4u8; 32], &blob).is_err());
}

#[test]
fn truncated_blob_is_rejected() {
    assert!(unwrap_private_key(&[3u8; 32], &[0u8; 20]).is_err());
}

#[test]
fn record_encoding_round_trips() {
    let blob = vec![0u8, 1, 2, 254, 255];
    let record = encode_record(&blob);
    assert!(!record.contains('\n'));
    assert_eq!(decode_record(&record).unwrap(), blob);
}

#[test]
fn record_decoding_rejects_garbage() {
    assert!(decode_record("not base64 at all!!!").is_err());
}

#[test]
fn memory_preferences_round_trip() {
    let mut store = MemoryPreferences::new();
    assert!(store.get("adbkey").is_none());

    store.put("adbkey", "dmFsdWU=").unwrap();
    assert_eq!(store.get("adbkey").as_deref(), Some("dmFsdWU="));
}

#[test]
fn file_preferences_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    {
        let mut store = FilePreferences::new(&path).unwrap();
        store.put("adbkey", "cmVjb3Jk").unwrap();
    }

    let store = FilePreferences::new(&path).unwrap();
    assert_eq!(store.get("adbkey").as_deref(), Some("cmVjb3Jk"));
}

#[test]
fn file_wrapping_key_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrap.key");

    let provider = FileWrappingKey::new(&path);
    let first = provider.wrapping_key().unwrap();
    let second = provider.wrapping_key().unwrap();
    assert_eq!(first, second);

    // A fresh provider reads the same key back from disk.
    let reopened = FileWrappingKey::new(&path);
    assert_eq!(reopened.wrapping_key().unwrap(), first);
}
