//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur in keyswap cryptographic operations.
///
/// None of these are fatal to the process. They are terminal for the
/// operation that produced them and must never be downgraded to success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Peer public key is not a valid P-256 public key.
    ///
    /// Covers malformed JWK text, the wrong key type or curve, points off the
    /// curve, JWKs carrying a private component, and degenerate shared
    /// secrets.
    #[error("invalid peer key: {reason}")]
    InvalidPeerKey {
        /// Description of the failure
        reason: String,
    },

    /// Authentication tag did not verify.
    ///
    /// The payload was tampered with, truncated, or sealed under another key.
    /// Carries no detail about which.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Payload text is not valid base64url.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// Description of the failure
        reason: String,
    },
}
