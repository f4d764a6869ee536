//! Client
//!
//! Action-based client state machine for the keyswap exchange. Drives one
//! two-party exchange: deposit our ephemeral public key, poll for the peer's,
//! derive the shared symmetric key.
//!
//! # Architecture
//!
//! The client is Sans-IO. It receives events ([`ExchangeEvent`]) describing
//! what the relay answered or how much time has passed, and returns actions
//! ([`ExchangeAction`]) for the caller to perform over whatever transport it
//! uses. Waiting for the peer is the caller re-issuing [`ExchangeAction::Poll`]
//! when a [`ExchangeEvent::Tick`] says it is due; nothing here sleeps.
//!
//! # Roles
//!
//! ```text
//! Initiator: Deposit ─► DepositAccepted ─► Poll ... PeerKeyReceived ─► Established
//! Responder: Poll ... PeerKeyReceived ─► Deposit ─► DepositAccepted ─► Established
//! ```
//!
//! # Components
//!
//! - [`Exchange`]: Per-peer exchange state machine
//! - [`ExchangeEvent`]: Events fed into the exchange
//! - [`ExchangeAction`]: Actions produced by the exchange

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod exchange;

pub use error::ClientError;
pub use event::{ExchangeAction, ExchangeEvent};
pub use exchange::{
    DEFAULT_EXCHANGE_TIMEOUT, DEFAULT_POLL_INTERVAL, Exchange, ExchangeClientConfig, Role,
};
pub use keyswap_crypto::{EncryptedPayload, SymmetricKey};
