//! JWK encoding of P-256 public keys.
//!
//! Public keys cross the relay as RFC 7517 EC JWKs:
//! `{"kty":"EC","crv":"P-256","x":"<base64url>","y":"<base64url>"}`.

use std::fmt;

use p256::PublicKey;

use crate::error::CryptoError;

/// Upper bound on accepted JWK text length.
///
/// A P-256 public JWK is under 150 bytes; anything near this limit is junk.
pub const MAX_JWK_LEN: usize = 1024;

/// A validated P-256 public key together with its canonical JWK text.
///
/// Construction always validates the point, so holding a `PublicKeyJwk` means
/// the key is usable for key agreement. The stored text is re-encoded from the
/// parsed point, dropping any extra members the sender included.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyJwk {
    key: PublicKey,
    encoded: String,
}

impl PublicKeyJwk {
    /// Parse and validate JWK text.
    ///
    /// # Errors
    ///
    /// - `InvalidPeerKey`: text is oversized, not JSON, carries a private
    ///   component (`d`), or does not describe a point on P-256
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        if text.len() > MAX_JWK_LEN {
            return Err(CryptoError::InvalidPeerKey {
                reason: format!("JWK exceeds {MAX_JWK_LEN} bytes"),
            });
        }

        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CryptoError::InvalidPeerKey { reason: format!("not JSON: {e}") })?;

        let Some(members) = value.as_object() else {
            return Err(CryptoError::InvalidPeerKey { reason: "JWK is not an object".to_string() });
        };

        if members.contains_key("d") {
            return Err(CryptoError::InvalidPeerKey {
                reason: "JWK contains a private component".to_string(),
            });
        }

        // Only the public members are handed to the point decoder
        let mut public = serde_json::Map::new();
        for member in ["kty", "crv", "x", "y"] {
            let Some(field) = members.get(member) else {
                return Err(CryptoError::InvalidPeerKey {
                    reason: format!("JWK is missing \"{member}\""),
                });
            };
            public.insert(member.to_string(), field.clone());
        }

        let key = PublicKey::from_jwk_str(&serde_json::Value::Object(public).to_string())
            .map_err(|_| CryptoError::InvalidPeerKey {
                reason: "not a P-256 public key".to_string(),
            })?;

        Ok(Self::from_public_key(key))
    }

    /// Wrap an already validated public key.
    pub fn from_public_key(key: PublicKey) -> Self {
        Self { encoded: key.to_jwk_string(), key }
    }

    /// Canonical JWK text.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Parsed public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// Consume and return the canonical JWK text.
    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl fmt::Debug for PublicKeyJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKeyJwk").field(&self.encoded).finish()
    }
}

impl fmt::Display for PublicKeyJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
