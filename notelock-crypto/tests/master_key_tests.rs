use notelock_crypto::master::{self, MasterKey};
use notelock_crypto::{CipherBlob, CryptoError, PrivateKey, blob};

#[test]
fn create_unwrap_roundtrip() {
    let recipient = PrivateKey::generate();
    let (master_key, wrapped) = master::create(&recipient.public_key()).unwrap();

    let recovered = master::unwrap(&recipient, &wrapped).unwrap();
    assert_eq!(recovered.as_bytes(), master_key.as_bytes());
}

#[test]
fn wrong_private_key_fails_to_unwrap() {
    let recipient = PrivateKey::generate();
    let other = PrivateKey::generate();
    let (_, wrapped) = master::create(&recipient.public_key()).unwrap();

    assert_eq!(master::unwrap(&other, &wrapped).unwrap_err(), CryptoError::UnwrapFailed);
}

#[test]
fn each_wrap_produces_different_blob() {
    let recipient = PrivateKey::generate();
    let master_key = MasterKey::generate();

    let a = master::wrap(&master_key, &recipient.public_key()).unwrap();
    let b = master::wrap(&master_key, &recipient.public_key()).unwrap();
    assert_ne!(a, b);

    // Different ephemeral keys
    let pa = CipherBlob::decode(&a).unwrap();
    let pb = CipherBlob::decode(&b).unwrap();
    assert_ne!(&pa.ciphertext[..32], &pb.ciphertext[..32]);

    assert_eq!(master::unwrap(&recipient, &a).unwrap().as_bytes(), master_key.as_bytes());
    assert_eq!(master::unwrap(&recipient, &b).unwrap().as_bytes(), master_key.as_bytes());
}

#[test]
fn tampering_anywhere_is_unwrap_failure() {
    let recipient = PrivateKey::generate();
    let (_, wrapped) = master::create(&recipient.public_key()).unwrap();
    let parsed = CipherBlob::decode(&wrapped).unwrap();

    for i in 0..parsed.ciphertext.len() {
        let mut ciphertext = parsed.ciphertext.clone();
        ciphertext[i] ^= 0x80;
        let tampered = blob::encode(&parsed.salt, &parsed.nonce, &ciphertext);
        assert_eq!(
            master::unwrap(&recipient, &tampered).unwrap_err(),
            CryptoError::UnwrapFailed,
            "tampering at ciphertext byte {i}"
        );
    }

    let mut salt = *parsed.salt.as_bytes();
    salt[0] ^= 0x01;
    let tampered = blob::encode(
        &notelock_crypto::Salt::from_bytes(salt),
        &parsed.nonce,
        &parsed.ciphertext,
    );
    assert_eq!(master::unwrap(&recipient, &tampered).unwrap_err(), CryptoError::UnwrapFailed);
}

#[test]
fn malformed_wrapped_key_is_unwrap_failure() {
    let recipient = PrivateKey::generate();
    assert_eq!(master::unwrap(&recipient, "%%%").unwrap_err(), CryptoError::UnwrapFailed);
    assert_eq!(master::unwrap(&recipient, "").unwrap_err(), CryptoError::UnwrapFailed);
}

#[test]
fn rewrap_moves_same_master_key_to_new_keypair() {
    let old_keys = PrivateKey::generate();
    let new_keys = PrivateKey::generate();
    let (master_key, wrapped) = master::create(&old_keys.public_key()).unwrap();

    let rewrapped = master::rewrap(&old_keys, &new_keys.public_key(), &wrapped).unwrap();

    let recovered = master::unwrap(&new_keys, &rewrapped).unwrap();
    assert_eq!(recovered.as_bytes(), master_key.as_bytes());
    assert_eq!(master::unwrap(&old_keys, &rewrapped).unwrap_err(), CryptoError::UnwrapFailed);
}

#[test]
fn master_wrapped_data_roundtrip() {
    let master_key = MasterKey::generate();
    let token = master::seal_with_master(&master_key, b"legacy note", b"user1:note").unwrap();

    let plaintext = master::open_with_master(&master_key, &token, b"user1:note").unwrap();
    assert_eq!(plaintext.as_slice(), b"legacy note");

    assert_eq!(
        master::open_with_master(&master_key, &token, b"user1:diary").unwrap_err(),
        CryptoError::AuthenticationFailed
    );
    assert_eq!(
        master::open_with_master(&MasterKey::generate(), &token, b"user1:note").unwrap_err(),
        CryptoError::AuthenticationFailed
    );
}
