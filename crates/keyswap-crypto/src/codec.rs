//! Payload encryption using `XChaCha20-Poly1305`.
//!
//! Nonces are always drawn internally from a CSPRNG. There is no entry point
//! that accepts a caller-chosen nonce, so nonce reuse under one key cannot be
//! requested through this API. The 192-bit nonce space makes random collisions
//! negligible.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use rand::{CryptoRng, RngCore, rngs::OsRng};

use crate::{derivation::SymmetricKey, error::CryptoError};

/// Size of the `XChaCha20` nonce (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// An encrypted payload: the nonce it was sealed under plus the ciphertext.
///
/// Wire layout: `nonce (24) || ciphertext || tag (16)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// The 24-byte `XChaCha20` nonce.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// The ciphertext including the 16-byte Poly1305 tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }

    /// Encode as `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Decode from `nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed`: shorter than a nonce plus a tag. A truncated
    ///   payload is indistinguishable from a tampered one.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self { nonce, ciphertext: ciphertext.to_vec() })
    }

    /// Encode as unpadded base64url text, for JSON transports.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_bytes())
    }

    /// Decode from unpadded base64url text.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload`: invalid base64url
    /// - `AuthenticationFailed`: decoded bytes are too short
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(text)
            .map_err(|e| CryptoError::MalformedPayload { reason: e.to_string() })?;
        Self::from_bytes(&bytes)
    }
}

/// Encrypt a payload under `key` with a fresh nonce from the OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> EncryptedPayload {
    encrypt_with_rng(key, plaintext, &mut OsRng)
}

/// Encrypt a payload under `key` with a fresh nonce drawn from `rng`.
///
/// The RNG is the only nonce source. Caller MUST provide a CSPRNG in
/// production.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    key: &SymmetricKey,
    plaintext: &[u8],
    rng: &mut R,
) -> EncryptedPayload {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    EncryptedPayload { nonce, ciphertext }
}

/// Decrypt and authenticate a payload.
///
/// # Errors
///
/// - `AuthenticationFailed`: tag mismatch (tampered payload or wrong key).
///   No plaintext is released on failure.
pub fn decrypt(key: &SymmetricKey, payload: &EncryptedPayload) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = XNonce::from_slice(&payload.nonce);

    cipher
        .decrypt(nonce, payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::derivation::SYMMETRIC_KEY_SIZE;

    fn test_key(fill: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([fill; SYMMETRIC_KEY_SIZE])
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key(42);
        let plaintext = b"Hello, World!";

        let payload = encrypt(&key, plaintext);
        let decrypted = decrypt(&key, &payload).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key(1);

        let payload = encrypt(&key, b"");
        let decrypted = decrypt(&key, &payload).unwrap();

        assert!(decrypted.is_empty());
        assert_eq!(payload.ciphertext().len(), TAG_SIZE);
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key(2);
        let plaintext = vec![0x42u8; 1024 * 1024]; // 1MB

        let payload = encrypt(&key, &plaintext);
        let decrypted = decrypt(&key, &payload).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let key = test_key(3);
        let plaintext = b"test message";

        let payload = encrypt(&key, plaintext);

        assert_eq!(payload.ciphertext().len(), plaintext.len() + TAG_SIZE);
        assert_eq!(payload.plaintext_len(), plaintext.len());
    }

    #[test]
    fn every_encryption_uses_a_fresh_nonce() {
        let key = test_key(4);
        let plaintext = b"same input";

        let first = encrypt(&key, plaintext);
        let second = encrypt(&key, plaintext);

        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.ciphertext(), second.ciphertext());
    }

    #[test]
    fn seeded_rng_is_the_nonce_source() {
        let key = test_key(5);

        let first = encrypt_with_rng(&key, b"x", &mut ChaCha20Rng::seed_from_u64(9));
        let second = encrypt_with_rng(&key, b"x", &mut ChaCha20Rng::seed_from_u64(9));

        assert_eq!(first, second);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let payload = encrypt(&test_key(6), b"secret message");

        let result = decrypt(&test_key(7), &payload);

        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key(8);
        let mut bytes = encrypt(&key, b"original message").to_bytes();

        bytes[NONCE_SIZE] ^= 0x01;
        let tampered = EncryptedPayload::from_bytes(&bytes).unwrap();

        assert_eq!(decrypt(&key, &tampered), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn tampered_nonce_fails_decryption() {
        let key = test_key(9);
        let mut bytes = encrypt(&key, b"original message").to_bytes();

        bytes[0] ^= 0x80;
        let tampered = EncryptedPayload::from_bytes(&bytes).unwrap();

        assert_eq!(decrypt(&key, &tampered), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn bytes_roundtrip_preserves_payload() {
        let payload = encrypt(&test_key(10), b"wire format");

        let restored = EncryptedPayload::from_bytes(&payload.to_bytes()).unwrap();

        assert_eq!(restored, payload);
    }

    #[test]
    fn base64_roundtrip_preserves_payload() {
        let payload = encrypt(&test_key(11), b"text transport");

        let restored = EncryptedPayload::from_base64(&payload.to_base64()).unwrap();

        assert_eq!(restored, payload);
    }

    #[test]
    fn truncated_payload_fails_authentication() {
        let key = test_key(12);
        let mut bytes = encrypt(&key, b"").to_bytes();
        bytes.pop();

        let result = EncryptedPayload::from_bytes(&bytes).and_then(|p| decrypt(&key, &p));

        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn truncated_body_fails_authentication() {
        let key = test_key(13);
        let mut bytes = encrypt(&key, b"longer than a tag").to_bytes();
        bytes.truncate(bytes.len() - 1);

        let truncated = EncryptedPayload::from_bytes(&bytes).unwrap();

        assert_eq!(decrypt(&key, &truncated), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let result = EncryptedPayload::from_base64("not base64!!");

        assert!(matches!(result, Err(CryptoError::MalformedPayload { .. })));
    }
}
