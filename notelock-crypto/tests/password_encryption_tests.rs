//! Round-trip, tamper and wrong-credential tests for the password-only
//! scheme (password → KDF → ChaCha20-Poly1305 → blob token).

use notelock_crypto::{
    CipherBlob, CryptoError, KdfParams, MIN_BLOB_LEN, blob, decrypt_string, decrypt_with_password,
    encrypt_string, encrypt_with_password,
};

const CHEAP: KdfParams = KdfParams::Argon2id {
    memory_kib: 64,
    iterations: 1,
    parallelism: 1,
};

// ── Round Trip ──

#[test]
fn hello_secret_world_roundtrip() {
    let token = encrypt_string("Hello, secret world!", "correct-horse", "user1:note", &CHEAP).unwrap();
    let plaintext = decrypt_string(&token, "correct-horse", "user1:note", &CHEAP).unwrap();
    assert_eq!(plaintext.as_str(), "Hello, secret world!");
}

#[test]
fn wrong_aad_is_authentication_failure() {
    let token = encrypt_string("Hello, secret world!", "correct-horse", "user1:note", &CHEAP).unwrap();
    let err = decrypt_string(&token, "correct-horse", "user1:diary", &CHEAP).unwrap_err();
    assert_eq!(err, CryptoError::AuthenticationFailed);
}

#[test]
fn wrong_password_is_authentication_failure() {
    let token = encrypt_string("Hello, secret world!", "correct-horse", "user1:note", &CHEAP).unwrap();
    let err = decrypt_string(&token, "battery-staple", "user1:note", &CHEAP).unwrap_err();
    assert_eq!(err, CryptoError::AuthenticationFailed);
}

#[test]
fn wrong_password_and_wrong_aad_are_indistinguishable() {
    let token = encrypt_string("msg", "pw-one", "a:b", &CHEAP).unwrap();
    let wrong_pw = decrypt_string(&token, "pw-two", "a:b", &CHEAP).unwrap_err();
    let wrong_aad = decrypt_string(&token, "pw-one", "a:c", &CHEAP).unwrap_err();
    assert_eq!(wrong_pw, wrong_aad);
    assert_eq!(wrong_pw.to_string(), wrong_aad.to_string());
}

#[test]
fn empty_plaintext_roundtrip() {
    let token = encrypt_with_password(b"", "pw", b"u:f", &CHEAP).unwrap();
    let plaintext = decrypt_with_password(&token, "pw", b"u:f", &CHEAP).unwrap();
    assert!(plaintext.is_empty());
    assert!(blob::validate(&token));
}

#[test]
fn hundred_thousand_char_plaintext_roundtrip() {
    let text: String = "abcdefghij".repeat(10_000);
    assert_eq!(text.len(), 100_000);
    let token = encrypt_string(&text, "pw", "u:f", &CHEAP).unwrap();
    let plaintext = decrypt_string(&token, "pw", "u:f", &CHEAP).unwrap();
    assert_eq!(plaintext.as_str(), text);
}

#[test]
fn multibyte_text_roundtrip() {
    let text = "Grüße, 秘密, 🔐";
    let token = encrypt_string(text, "pw", "u:f", &CHEAP).unwrap();
    assert_eq!(decrypt_string(&token, "pw", "u:f", &CHEAP).unwrap().as_str(), text);
}

#[test]
fn pbkdf2_roundtrip() {
    let params = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };
    let token = encrypt_string("pbkdf2 note", "pw", "u:f", &params).unwrap();
    assert_eq!(decrypt_string(&token, "pw", "u:f", &params).unwrap().as_str(), "pbkdf2 note");
}

#[test]
fn mismatched_kdf_params_fail_authentication() {
    let token = encrypt_string("note", "pw", "u:f", &CHEAP).unwrap();
    let other = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };
    assert_eq!(
        decrypt_string(&token, "pw", "u:f", &other).unwrap_err(),
        CryptoError::AuthenticationFailed
    );
}

// ── Non-determinism ──

#[test]
fn each_encryption_produces_a_different_token() {
    let a = encrypt_string("same", "pw", "u:f", &CHEAP).unwrap();
    let b = encrypt_string("same", "pw", "u:f", &CHEAP).unwrap();
    assert_ne!(a, b);

    let pa = CipherBlob::decode(&a).unwrap();
    let pb = CipherBlob::decode(&b).unwrap();
    assert_ne!(pa.salt, pb.salt);
    assert_ne!(pa.nonce, pb.nonce);
}

// ── Tampering ──

#[test]
fn every_byte_position_tampering_detected() {
    let token = encrypt_string("integrity-protected note", "pw", "u:f", &CHEAP).unwrap();
    let parsed = CipherBlob::decode(&token).unwrap();
    let raw_len = 16 + 12 + parsed.ciphertext.len();

    for i in 0..raw_len {
        let mut salt = *parsed.salt.as_bytes();
        let mut nonce = *parsed.nonce.as_bytes();
        let mut ciphertext = parsed.ciphertext.clone();
        match i {
            0..16 => salt[i] ^= 0x01,
            16..28 => nonce[i - 16] ^= 0x01,
            _ => ciphertext[i - 28] ^= 0x01,
        }
        let tampered = blob::encode(
            &notelock_crypto::Salt::from_bytes(salt),
            &notelock_crypto::Nonce::from_bytes(nonce),
            &ciphertext,
        );
        assert!(
            decrypt_with_password(&tampered, "pw", b"u:f", &CHEAP).is_err(),
            "tampering at byte {i} must be detected"
        );
    }
}

// ── Malformed Input ──

#[test]
fn truncated_token_rejected_before_derivation() {
    // Argon2 with these params would fail; MalformedBlob proves the KDF never ran.
    let invalid_kdf = KdfParams::Argon2id {
        memory_kib: 0,
        iterations: 0,
        parallelism: 0,
    };
    let short = base64_of(&[0u8; MIN_BLOB_LEN - 1]);
    let err = decrypt_with_password(&short, "pw", b"", &invalid_kdf).unwrap_err();
    assert!(matches!(err, CryptoError::MalformedBlob(_)));
}

#[test]
fn non_base64_token_rejected() {
    let err = decrypt_with_password("not base64 at all!!", "pw", b"", &CHEAP).unwrap_err();
    assert!(matches!(err, CryptoError::MalformedBlob(_)));
}

#[test]
fn invalid_argon2_params_surface_as_derivation_failed() {
    let bad = KdfParams::Argon2id {
        memory_kib: 1,
        iterations: 1,
        parallelism: 1,
    };
    let err = encrypt_string("x", "pw", "u:f", &bad).unwrap_err();
    assert!(matches!(err, CryptoError::DerivationFailed(_)));
}

fn base64_of(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn seal_open_always_roundtrips(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            password in "\\PC{0,32}",
            aad in "[a-z0-9]{1,12}:[a-z]{1,12}",
        ) {
            let token = encrypt_with_password(&plaintext, &password, aad.as_bytes(), &CHEAP).unwrap();
            let recovered = decrypt_with_password(&token, &password, aad.as_bytes(), &CHEAP).unwrap();
            prop_assert_eq!(recovered.as_slice(), plaintext.as_slice());
        }

        #[test]
        fn short_tokens_never_validate(raw in proptest::collection::vec(any::<u8>(), 0..MIN_BLOB_LEN)) {
            prop_assert!(!blob::validate(&base64_of(&raw)));
        }
    }
}
