//! Keyswap exchange core.
//!
//! Protocol logic for relaying ephemeral public keys between two parties.
//! Pure logic with no network or runtime dependency: time comes from an
//! injected [`Environment`], identity from an injected [`IdentityResolver`].
//!
//! # Protocol
//!
//! ```text
//! A: deposit(recipient = B, pk_A) ──► RendezvousStore[B] = (from A, pk_A)
//! B: retrieve(sender = A)         ◄── take RendezvousStore[B] if from A
//! B: derive(sk_B, pk_A)
//! B: deposit(recipient = A, pk_B) ──► RendezvousStore[A] = (from B, pk_B)
//! A: retrieve(sender = B)         ◄── take RendezvousStore[A] if from B
//! A: derive(sk_A, pk_B)           ==  B's key
//! ```
//!
//! Nothing here blocks waiting for a peer. A retrieval that finds nothing
//! returns [`ExchangeError::PendingKeyNotFound`] and the caller polls again
//! later.
//!
//! # Components
//!
//! - [`ExchangeCoordinator`]: authentication, rate limiting, deposit/retrieve
//! - [`RendezvousStore`]: sharded one-shot deposit slots with TTL and capacity
//! - [`RateLimiter`]: per-identity retrieval cooldown
//! - [`HmacTokenResolver`]: bearer-token [`IdentityResolver`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod coordinator;
pub mod env;
mod error;
mod identity;
mod rate_limit;
mod shard;
mod store;
mod token;

pub use coordinator::{
    DepositPolicy, DepositRequest, ExchangeConfig, ExchangeCoordinator, SweepReport,
};
pub use env::{Environment, ManualEnv};
pub use error::ExchangeError;
pub use identity::{AuthError, Credential, IdentityError, IdentityResolver, MAX_USER_ID_LEN, UserId};
pub use keyswap_crypto::PublicKeyJwk;
pub use rate_limit::{DEFAULT_COOLDOWN, RateLimiter};
pub use store::{PendingDeposit, RendezvousStore, StoreConfig, StoreOutcome};
pub use token::HmacTokenResolver;
