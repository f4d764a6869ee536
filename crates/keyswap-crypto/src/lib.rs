//! Keyswap Cryptographic Primitives
//!
//! Cryptographic building blocks for the keyswap rendezvous exchange. Two
//! parties that never shared a secret each generate an ephemeral P-256 key
//! pair, swap public keys through an untrusted relay, and derive the same
//! symmetric key locally. The relay only ever sees public keys.
//!
//! # Key Lifecycle
//!
//! ```text
//! KeyPair::generate() (OS RNG)
//!        │
//!        ├── public key ──► JWK ──► relay ──► peer
//!        │
//!        ▼
//! ECDH(own private, peer public)
//!        │
//!        ▼
//! HKDF-SHA256(label || sorted public keys) → SymmetricKey
//!        │
//!        ▼
//! XChaCha20-Poly1305 (fresh random nonce per message) → Ciphertext
//! ```
//!
//! # Security
//!
//! Key Material:
//! - Private keys never leave [`KeyPair`]; there is no accessor or serializer
//! - [`SymmetricKey`] and private keys are zeroized on drop
//! - `Debug` output of secret types is redacted
//!
//! Peer Keys:
//! - JWKs are validated as on-curve P-256 points before use
//! - A JWK carrying a private component is rejected outright
//! - An all-zero shared secret is rejected rather than used
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD provides tamper-proof encryption
//! - Nonces are generated internally on every call; callers cannot supply one
//! - Failed authentication tag -> [`CryptoError::AuthenticationFailed`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod derivation;
mod error;
mod jwk;
mod keypair;

pub use codec::{EncryptedPayload, NONCE_SIZE, TAG_SIZE, decrypt, encrypt, encrypt_with_rng};
pub use derivation::{SYMMETRIC_KEY_SIZE, SymmetricKey, derive_symmetric_key};
pub use error::CryptoError;
pub use jwk::{MAX_JWK_LEN, PublicKeyJwk};
pub use keypair::KeyPair;
