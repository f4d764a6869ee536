//! Ephemeral P-256 key pairs.

use std::fmt;

use p256::SecretKey;
use rand::{CryptoRng, RngCore, rngs::OsRng};

use crate::jwk::PublicKeyJwk;

/// An ephemeral key pair for one exchange.
///
/// The private half has no accessor outside this crate and no serializer;
/// the only way to use it is [`crate::derive_symmetric_key`]. It is zeroized
/// when the key pair is dropped.
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKeyJwk,
}

impl KeyPair {
    /// Generate a key pair from the OS RNG.
    ///
    /// # Panics
    ///
    /// Panics if the OS RNG fails. Without secure randomness no key pair can
    /// be trusted, so the process must not continue.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a key pair from the supplied CSPRNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = SecretKey::random(rng);
        let public = PublicKeyJwk::from_public_key(secret.public_key());
        Self { secret, public }
    }

    /// Public half, ready to send to the peer.
    pub fn public_key(&self) -> &PublicKeyJwk {
        &self.public
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}
