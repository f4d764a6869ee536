//! User identities, credentials, and the identity resolver seam.
//!
//! Credential verification belongs to an external authentication subsystem.
//! The exchange only needs it as a function from an opaque credential to a
//! [`UserId`], expressed as the [`IdentityResolver`] trait.

use std::fmt;

use thiserror::Error;

/// Maximum accepted length of a user identifier, in bytes.
pub const MAX_USER_ID_LEN: usize = 128;

/// Stable user identifier (e.g. a database ID or handle).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user identifier.
    ///
    /// # Errors
    ///
    /// - `Empty`: identifier is empty
    /// - `TooLong`: identifier exceeds [`MAX_USER_ID_LEN`] bytes
    /// - `InvalidCharacter`: identifier contains control characters
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();

        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        if id.len() > MAX_USER_ID_LEN {
            return Err(IdentityError::TooLong { len: id.len() });
        }
        if id.chars().any(char::is_control) {
            return Err(IdentityError::InvalidCharacter);
        }

        Ok(Self(id))
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors from validating a [`UserId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Identifier is empty
    #[error("user id is empty")]
    Empty,

    /// Identifier is too long
    #[error("user id is {len} bytes, maximum is {MAX_USER_ID_LEN}")]
    TooLong {
        /// Actual length in bytes
        len: usize,
    },

    /// Identifier contains control characters
    #[error("user id contains control characters")]
    InvalidCharacter,
}

/// Opaque bearer credential presented by a caller.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Why a credential could not be resolved to a known user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credential is malformed or its signature does not verify
    #[error("invalid credential: {reason}")]
    Invalid {
        /// Description of the failure
        reason: String,
    },

    /// Credential was valid but has expired
    #[error("credential expired")]
    Expired,

    /// Credential names a user the directory does not know
    #[error("unknown user: {0}")]
    UnknownUser(UserId),
}

/// Maps a credential to an authenticated user identity.
///
/// Implementations are called from many request handlers concurrently.
pub trait IdentityResolver: Send + Sync {
    /// Resolve `credential` to the user it authenticates.
    fn resolve(&self, credential: &Credential) -> Result<UserId, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_ids() {
        assert_eq!(UserId::new("alice").unwrap().as_str(), "alice");
        assert_eq!(UserId::new("123456").unwrap().to_string(), "123456");
        assert!(UserId::new("@example user").is_ok());
    }

    #[test]
    fn rejects_empty_id() {
        assert_eq!(UserId::new(""), Err(IdentityError::Empty));
    }

    #[test]
    fn rejects_long_id() {
        let id = "a".repeat(MAX_USER_ID_LEN + 1);
        assert_eq!(UserId::new(id), Err(IdentityError::TooLong { len: MAX_USER_ID_LEN + 1 }));

        assert!(UserId::new("a".repeat(MAX_USER_ID_LEN)).is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(UserId::new("bob\n"), Err(IdentityError::InvalidCharacter));
        assert_eq!(UserId::new("b\u{0}b"), Err(IdentityError::InvalidCharacter));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
    }
}
