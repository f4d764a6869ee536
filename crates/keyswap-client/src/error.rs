//! Client error types.

use std::time::Duration;

use keyswap_crypto::CryptoError;
use thiserror::Error;

/// Errors from driving an [`Exchange`](crate::Exchange).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Peer key was invalid, or a payload failed to decrypt
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// No peer key arrived within the exchange timeout
    #[error("no peer key after {elapsed:?}")]
    Timeout {
        /// Time since the exchange was created
        elapsed: Duration,
    },

    /// Event does not apply to the current state
    #[error("unexpected event {event} in state {state}")]
    UnexpectedEvent {
        /// Event that was fed in
        event: &'static str,
        /// State the exchange was in
        state: &'static str,
    },

    /// Session key requested before the exchange completed
    #[error("exchange not established")]
    NotEstablished,
}
