use base64::{Engine, engine::general_purpose::STANDARD};
use storefront_api::codec::{CodecError, CredentialCodec, DECOY_CIPHERTEXT, NONCE_SIZE};

const SECRET: &str = "pass-secret-for-tests";

#[test]
fn test_encrypt_then_decrypt_recovers_password() {
    let codec = CredentialCodec::new(SECRET);

    let stored = codec.encrypt("pw1").unwrap();

    assert_ne!(stored, "pw1");
    assert_eq!(codec.decrypt(&stored).unwrap().as_str(), "pw1");
}

#[test]
fn test_same_password_never_encrypts_twice_the_same() {
    let codec = CredentialCodec::new(SECRET);

    let first = codec.encrypt("hunter2").unwrap();
    let second = codec.encrypt("hunter2").unwrap();

    // Fresh nonce per call.
    assert_ne!(first, second);
    assert!(codec.matches(&first, "hunter2"));
    assert!(codec.matches(&second, "hunter2"));
}

#[test]
fn test_stored_form_is_nonce_prefixed_base64() {
    let codec = CredentialCodec::new(SECRET);
    let stored = codec.encrypt("abc").unwrap();

    let raw = STANDARD.decode(&stored).unwrap();
    // nonce + 3 bytes of ciphertext + 16 byte GCM tag
    assert_eq!(raw.len(), NONCE_SIZE + 3 + 16);
}

#[test]
fn test_matches_rejects_wrong_candidate() {
    let codec = CredentialCodec::new(SECRET);
    let stored = codec.encrypt("correct horse").unwrap();

    assert!(!codec.matches(&stored, "correct hors"));
    assert!(!codec.matches(&stored, "correct horse "));
    assert!(!codec.matches(&stored, ""));
}

#[test]
fn test_different_secret_cannot_open_ciphertext() {
    let writer = CredentialCodec::new(SECRET);
    let reader = CredentialCodec::new("rotated-secret");
    let stored = writer.encrypt("pw1").unwrap();

    assert!(matches!(reader.decrypt(&stored), Err(CodecError::Decrypt)));
    assert!(!reader.matches(&stored, "pw1"));
}

#[test]
fn test_malformed_ciphertexts_are_errors_not_panics() {
    let codec = CredentialCodec::new(SECRET);

    assert!(matches!(
        codec.decrypt("%%% not base64 %%%"),
        Err(CodecError::Encoding)
    ));

    let short = STANDARD.encode([0u8; NONCE_SIZE]);
    assert!(matches!(codec.decrypt(&short), Err(CodecError::Truncated)));

    let mut raw = STANDARD.decode(codec.encrypt("pw1").unwrap()).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xff;
    assert!(matches!(
        codec.decrypt(&STANDARD.encode(raw)),
        Err(CodecError::Decrypt)
    ));

    // A plaintext password sitting in the store never matches.
    assert!(!codec.matches("pw1", "pw1"));
}

#[test]
fn test_unicode_passwords_survive() {
    let codec = CredentialCodec::new(SECRET);
    let stored = codec.encrypt("pässwörd-密码").unwrap();

    assert!(codec.matches(&stored, "pässwörd-密码"));
}

#[test]
fn test_decoy_is_well_formed_but_never_opens() {
    let codec = CredentialCodec::new(SECRET);

    // Reaches the GCM tag check instead of failing on encoding or length.
    assert!(matches!(
        codec.decrypt(DECOY_CIPHERTEXT),
        Err(CodecError::Decrypt)
    ));
    assert!(!codec.matches(DECOY_CIPHERTEXT, ""));
    assert!(!codec.matches(DECOY_CIPHERTEXT, "pw1"));
}
