//! Symmetric key derivation from ECDH using HKDF.

use std::fmt;

use hkdf::Hkdf;
use p256::elliptic_curve::{ecdh::diffie_hellman, sec1::ToEncodedPoint};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{error::CryptoError, jwk::PublicKeyJwk, keypair::KeyPair};

/// Label used for symmetric key derivation
const SYMMETRIC_KEY_LABEL: &[u8] = b"keyswapSymmetricV1";

/// Size of a compressed SEC1 P-256 point
const COMPRESSED_POINT_SIZE: usize = 33;

/// Size of a derived symmetric key in bytes
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// A symmetric key shared by the two parties of an exchange.
///
/// Equality is constant time. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Wrap raw key bytes (e.g. a key restored from secure local storage).
    pub fn from_bytes(key: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.key
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_slice().ct_eq(other.key.as_slice()).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the symmetric key shared with `peer`.
///
/// Runs ECDH between our private key and the peer's public key, then expands
/// the raw shared secret with HKDF-SHA256. The HKDF info binds both public
/// keys in a canonical order, so both sides derive the same key and the key
/// is specific to this pair of ephemeral keys.
///
/// # Errors
///
/// - `InvalidPeerKey`: the shared secret is degenerate (all zero)
pub fn derive_symmetric_key(
    own: &KeyPair,
    peer: &PublicKeyJwk,
) -> Result<SymmetricKey, CryptoError> {
    let shared = diffie_hellman(own.secret().to_nonzero_scalar(), peer.public_key().as_affine());
    let raw: &[u8] = shared.raw_secret_bytes();

    if raw.iter().all(|&b| b == 0) {
        return Err(CryptoError::InvalidPeerKey { reason: "degenerate shared secret".to_string() });
    }

    let own_point = own.public_key().public_key().to_encoded_point(true);
    let peer_point = peer.public_key().to_encoded_point(true);
    let (low, high) = if own_point.as_bytes() <= peer_point.as_bytes() {
        (own_point.as_bytes(), peer_point.as_bytes())
    } else {
        (peer_point.as_bytes(), own_point.as_bytes())
    };

    // Build the info parameter: label || low point || high point
    let mut info = Vec::with_capacity(SYMMETRIC_KEY_LABEL.len() + 2 * COMPRESSED_POINT_SIZE);
    info.extend_from_slice(SYMMETRIC_KEY_LABEL);
    info.extend_from_slice(low);
    info.extend_from_slice(high);

    let hkdf = Hkdf::<Sha256>::new(None, raw);
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(SymmetricKey { key })
}
