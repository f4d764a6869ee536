//! Exchange error types.

use std::time::Duration;

use thiserror::Error;

use crate::identity::{AuthError, UserId};

/// Errors from [`ExchangeCoordinator`](crate::ExchangeCoordinator)
/// operations.
///
/// Every variant maps to exactly one HTTP status via
/// [`status_code`](Self::status_code).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Request is missing a field or a field is invalid
    #[error("bad request: {reason}")]
    BadRequest {
        /// Which field and why
        reason: String,
    },

    /// No credential, or the credential did not verify
    #[error("unauthenticated: {reason}")]
    Unauthenticated {
        /// Why authentication failed
        reason: String,
    },

    /// Credential verified but names no known user
    #[error("forbidden: unknown user {user}")]
    Forbidden {
        /// The unrecognised identity
        user: UserId,
    },

    /// Retrieval attempted inside the caller's cooldown window
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Time until the next attempt would be permitted
        retry_after: Duration,
    },

    /// No deposit from the named sender is waiting for the caller
    #[error("no pending key from {sender}")]
    PendingKeyNotFound {
        /// Sender the caller asked for
        sender: UserId,
    },
}

impl ExchangeError {
    /// Whether retrying the same request later may succeed.
    ///
    /// `RateLimited` clears after the cooldown. `PendingKeyNotFound` is the
    /// normal "peer has not deposited yet" signal and callers are expected to
    /// poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::PendingKeyNotFound { .. })
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthenticated { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::PendingKeyNotFound { .. } => 404,
            Self::RateLimited { .. } => 429,
        }
    }

    pub(crate) fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest { reason: reason.into() }
    }
}

impl From<AuthError> for ExchangeError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid { reason } => Self::Unauthenticated { reason },
            AuthError::Expired => Self::Unauthenticated { reason: "credential expired".to_string() },
            AuthError::UnknownUser(user) => Self::Forbidden { user },
        }
    }
}
