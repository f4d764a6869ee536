//! Exchange events and actions.

use std::time::Duration;

/// Events the caller feeds into the exchange.
///
/// The caller is responsible for:
/// - Performing each [`ExchangeAction`] against the relay
/// - Reporting the relay's answer as the matching event
/// - Driving time forward via ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent<I = std::time::Instant> {
    /// Begin the exchange.
    Start,

    /// Relay accepted our deposit.
    DepositAccepted,

    /// Relay returned the peer's public key.
    PeerKeyReceived {
        /// Peer's public key as JWK text
        public_key_jwk: String,
    },

    /// Relay has nothing from the peer yet.
    PeerKeyPending,

    /// Relay rejected the poll for arriving inside the cooldown.
    RateLimited {
        /// Time until the relay permits another poll
        retry_after: Duration,
    },

    /// Time tick for poll scheduling and timeout.
    Tick {
        /// Current time from the environment
        now: I,
    },
}

impl<I> ExchangeEvent<I> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::DepositAccepted => "DepositAccepted",
            Self::PeerKeyReceived { .. } => "PeerKeyReceived",
            Self::PeerKeyPending => "PeerKeyPending",
            Self::RateLimited { .. } => "RateLimited",
            Self::Tick { .. } => "Tick",
        }
    }
}

/// Actions the exchange produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeAction {
    /// Deposit our public key for the peer (`POST /keyExchange`).
    Deposit {
        /// Peer identity the key is for
        recipient_id: String,
        /// Our public key as JWK text
        public_key_jwk: String,
    },

    /// Ask for the peer's public key (`GET /keyExchange?sender=`).
    Poll {
        /// Peer identity the key should come from
        sender_id: String,
    },

    /// Both keys are in place; the session key is available.
    Established,

    /// The exchange failed and will not make progress.
    Failed {
        /// Description of the failure
        reason: String,
    },
}
