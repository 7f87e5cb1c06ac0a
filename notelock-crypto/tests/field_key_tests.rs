use notelock_crypto::{
    CipherBlob, CryptoError, MasterKey, Salt, derive_field_key, open_field, seal_field,
};
use pretty_assertions::assert_ne;

#[test]
fn derivation_is_deterministic() {
    let master_key = MasterKey::generate();
    let salt = Salt::random();

    let a = derive_field_key(&master_key, &salt, "note").unwrap();
    let b = derive_field_key(&master_key, &salt, "note").unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn field_id_salt_and_master_all_separate_keys() {
    let master_key = MasterKey::generate();
    let salt = Salt::random();
    let base = derive_field_key(&master_key, &salt, "note").unwrap();

    let other_field = derive_field_key(&master_key, &salt, "diary").unwrap();
    let other_salt = derive_field_key(&master_key, &Salt::random(), "note").unwrap();
    let other_master = derive_field_key(&MasterKey::generate(), &salt, "note").unwrap();

    assert_ne!(base.as_bytes(), other_field.as_bytes());
    assert_ne!(base.as_bytes(), other_salt.as_bytes());
    assert_ne!(base.as_bytes(), other_master.as_bytes());
    assert_ne!(base.as_bytes(), master_key.as_bytes());
}

#[test]
fn sealed_blob_carries_field_salt() {
    let master_key = MasterKey::generate();
    let salt = Salt::random();
    let key = derive_field_key(&master_key, &salt, "note").unwrap();

    let token = key.seal(b"field data", b"user1:note").unwrap();
    assert_eq!(CipherBlob::decode(&token).unwrap().salt, salt);
}

#[test]
fn seal_open_field_roundtrip() {
    let master_key = MasterKey::generate();
    let token = seal_field(&master_key, "note", b"Hello, secret world!", b"user1:note").unwrap();

    let plaintext = open_field(&master_key, "note", &token, b"user1:note").unwrap();
    assert_eq!(plaintext.as_slice(), b"Hello, secret world!");
}

#[test]
fn opening_under_another_field_id_fails() {
    let master_key = MasterKey::generate();
    let token = seal_field(&master_key, "note", b"data", b"user1:note").unwrap();
    assert_eq!(
        open_field(&master_key, "diary", &token, b"user1:note").unwrap_err(),
        CryptoError::AuthenticationFailed
    );
}

#[test]
fn field_key_rejects_blob_with_foreign_salt() {
    let master_key = MasterKey::generate();
    let token = seal_field(&master_key, "note", b"data", b"aad").unwrap();
    let parsed = CipherBlob::decode(&token).unwrap();

    let unrelated = derive_field_key(&master_key, &Salt::random(), "note").unwrap();
    assert_eq!(unrelated.open(&parsed, b"aad").unwrap_err(), CryptoError::AuthenticationFailed);
}
