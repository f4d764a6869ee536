//! Property-based tests for the keyswap primitives
//!
//! These tests verify the invariants the exchange exists to deliver:
//!
//! 1. **Symmetry**: derive(A.private, B.public) == derive(B.private, A.public)
//! 2. **Round-trip**: decrypt(encrypt(m)) == m for all messages
//! 3. **Tamper detection**: any flipped bit or truncation fails authentication
//! 4. **Key isolation**: keys derived with a third party cannot decrypt

use keyswap_crypto::{
    CryptoError, EncryptedPayload, KeyPair, PublicKeyJwk, SymmetricKey, decrypt,
    derive_symmetric_key, encrypt, encrypt_with_rng,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn seeded_pair(seed: u64) -> KeyPair {
    KeyPair::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(seed))
}

// Shared key between two seeded parties, going through JWK text like the relay
fn exchange(a_seed: u64, b_seed: u64) -> (SymmetricKey, SymmetricKey) {
    let a = seeded_pair(a_seed);
    let b = seeded_pair(b_seed);

    let b_public = PublicKeyJwk::parse(b.public_key().as_str()).unwrap();
    let a_public = PublicKeyJwk::parse(a.public_key().as_str()).unwrap();

    (derive_symmetric_key(&a, &b_public).unwrap(), derive_symmetric_key(&b, &a_public).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_shared_key_symmetry(a_seed in any::<u64>(), b_seed in any::<u64>()) {
        let (a_key, b_key) = exchange(a_seed, b_seed);
        prop_assert_eq!(a_key, b_key);
    }

    #[test]
    fn prop_third_party_key_differs(
        a_seed in any::<u64>(),
        b_seed in any::<u64>(),
        c_seed in any::<u64>(),
    ) {
        prop_assume!(b_seed != c_seed);

        let a = seeded_pair(a_seed);
        let b = seeded_pair(b_seed);
        let c = seeded_pair(c_seed);

        let a_b = derive_symmetric_key(&a, b.public_key()).unwrap();
        let a_c = derive_symmetric_key(&a, c.public_key()).unwrap();

        prop_assert_ne!(a_b, a_c);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..4096),
        key_bytes in any::<[u8; 32]>(),
        rng_seed in any::<u64>(),
    ) {
        let key = SymmetricKey::from_bytes(key_bytes);
        let payload = encrypt_with_rng(&key, &plaintext, &mut ChaCha20Rng::seed_from_u64(rng_seed));

        prop_assert_eq!(decrypt(&key, &payload).unwrap(), plaintext);
    }

    #[test]
    fn prop_any_bit_flip_fails_authentication(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        key_bytes in any::<[u8; 32]>(),
        bit in any::<prop::sample::Index>(),
    ) {
        let key = SymmetricKey::from_bytes(key_bytes);
        let mut bytes = encrypt(&key, &plaintext).to_bytes();

        let position = bit.index(bytes.len() * 8);
        bytes[position / 8] ^= 1 << (position % 8);

        let tampered = EncryptedPayload::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decrypt(&key, &tampered), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn prop_any_truncation_fails_authentication(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        key_bytes in any::<[u8; 32]>(),
        cut in any::<prop::sample::Index>(),
    ) {
        let key = SymmetricKey::from_bytes(key_bytes);
        let bytes = encrypt(&key, &plaintext).to_bytes();

        let truncated = &bytes[..cut.index(bytes.len())];
        let result = EncryptedPayload::from_bytes(truncated).and_then(|p| decrypt(&key, &p));

        prop_assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn prop_wrong_key_fails_authentication(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        key_bytes in any::<[u8; 32]>(),
        other_bytes in any::<[u8; 32]>(),
    ) {
        prop_assume!(key_bytes != other_bytes);

        let payload = encrypt(&SymmetricKey::from_bytes(key_bytes), &plaintext);
        let result = decrypt(&SymmetricKey::from_bytes(other_bytes), &payload);

        prop_assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }
}

#[test]
fn exchanged_keys_interoperate() {
    let (a_key, b_key) = exchange(1, 2);

    let to_b = encrypt(&a_key, b"hi bob");
    let to_a = encrypt(&b_key, b"hi alice");

    assert_eq!(decrypt(&b_key, &to_b).unwrap(), b"hi bob");
    assert_eq!(decrypt(&a_key, &to_a).unwrap(), b"hi alice");
}
