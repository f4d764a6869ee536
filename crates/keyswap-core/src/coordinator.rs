//! Exchange coordinator.
//!
//! Orchestrates the deposit/retrieve protocol over the [`RendezvousStore`],
//! applies the per-identity retrieval cooldown, and enforces the
//! authentication policy in both directions.
//!
//! Neither operation blocks waiting for a peer. "Waiting" is the client
//! re-issuing a retrieval after [`ExchangeError::PendingKeyNotFound`].

use std::time::Duration;

use keyswap_crypto::PublicKeyJwk;

use crate::{
    env::Environment,
    error::ExchangeError,
    identity::{Credential, IdentityResolver, UserId},
    rate_limit::{DEFAULT_COOLDOWN, RateLimiter},
    store::{PendingDeposit, RendezvousStore, StoreConfig, StoreOutcome},
};

/// Who may deposit a public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepositPolicy {
    /// Deposits require a credential. The depositor's identity is recorded
    /// and a retrieval only releases a key deposited by the sender it names.
    #[default]
    Authenticated,

    /// Deposits without a credential are accepted and released to the
    /// recipient whatever sender it names. A credential, if presented, must
    /// still verify.
    Open,
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Minimum interval between permitted retrievals per identity
    pub cooldown: Duration,
    /// Rendezvous store sizing and expiry
    pub store: StoreConfig,
    /// Deposit authentication policy
    pub deposit_policy: DepositPolicy,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            store: StoreConfig::default(),
            deposit_policy: DepositPolicy::default(),
        }
    }
}

/// Deposit request as received from the transport.
///
/// Fields are optional so that a missing field is reported as
/// [`ExchangeError::BadRequest`] rather than a transport decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositRequest {
    /// Identity the key is intended for
    pub recipient_id: Option<String>,
    /// Depositor's public key as a JWK string
    pub public_key_jwk: Option<String>,
}

impl DepositRequest {
    /// Request with both fields present.
    pub fn new(recipient_id: impl Into<String>, public_key_jwk: impl Into<String>) -> Self {
        Self {
            recipient_id: Some(recipient_id.into()),
            public_key_jwk: Some(public_key_jwk.into()),
        }
    }
}

/// What a [`sweep`](ExchangeCoordinator::sweep) purged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Deposits dropped for exceeding the TTL
    pub expired_deposits: usize,
    /// Rate-limit entries whose window had closed
    pub expired_rate_limits: usize,
}

/// Deposit/retrieve protocol over shared, interior-synchronized state.
///
/// Constructed once at startup and shared by every request handler. All
/// methods take `&self`.
pub struct ExchangeCoordinator<E: Environment, R> {
    env: E,
    resolver: R,
    store: RendezvousStore<E::Instant>,
    limiter: RateLimiter<E::Instant>,
    deposit_policy: DepositPolicy,
}

impl<E, R> ExchangeCoordinator<E, R>
where
    E: Environment,
    R: IdentityResolver,
{
    /// Create a coordinator with an empty store.
    pub fn new(env: E, resolver: R, config: ExchangeConfig) -> Self {
        Self {
            store: RendezvousStore::new(&config.store),
            limiter: RateLimiter::new(config.cooldown, config.store.shards),
            deposit_policy: config.deposit_policy,
            env,
            resolver,
        }
    }

    /// Deposit the caller's public key for `request.recipient_id`.
    ///
    /// Replaces any pending deposit for the same recipient.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`/`Forbidden`: credential missing (when required),
    ///   invalid, expired, or naming an unknown user
    /// - `BadRequest`: a field is missing, the recipient is not a valid user
    ///   id, or the JWK is not a P-256 public key
    pub fn submit_public_key(
        &self,
        credential: Option<&Credential>,
        request: DepositRequest,
    ) -> Result<StoreOutcome, ExchangeError> {
        let depositor = match (self.deposit_policy, credential) {
            (DepositPolicy::Open, None) => None,
            (_, credential) => Some(self.authenticate(credential)?),
        };

        let (Some(recipient_id), Some(public_key_jwk)) =
            (request.recipient_id, request.public_key_jwk)
        else {
            return Err(ExchangeError::bad_request("recipientId and publicKeyJwk are required"));
        };

        let recipient = UserId::new(recipient_id)
            .map_err(|e| ExchangeError::bad_request(format!("recipientId: {e}")))?;
        let public_key = PublicKeyJwk::parse(&public_key_jwk)
            .map_err(|e| ExchangeError::bad_request(format!("publicKeyJwk: {e}")))?;

        if depositor.is_none() {
            tracing::warn!(recipient = %recipient, "Unauthenticated deposit accepted");
        }

        let outcome = self.store.deposit(PendingDeposit {
            recipient: recipient.clone(),
            depositor: depositor.clone(),
            public_key,
            deposited_at: self.env.now(),
        });

        if outcome == StoreOutcome::Evicted {
            tracing::warn!(recipient = %recipient, "Rendezvous store full, evicted oldest deposit");
        }
        tracing::debug!(
            recipient = %recipient,
            depositor = ?depositor.as_ref().map(UserId::as_str),
            ?outcome,
            "Public key deposited"
        );

        Ok(outcome)
    }

    /// Take the public key `sender` deposited for the caller.
    ///
    /// Steps run in a fixed order: authenticate, rate limit, require
    /// `sender`, take. A permitted attempt consumes the caller's cooldown
    /// window even if it then fails.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`/`Forbidden`: credential missing, invalid, expired,
    ///   or naming an unknown user
    /// - `RateLimited`: caller retrieved within the cooldown window
    /// - `BadRequest`: `sender` is missing or not a valid user id
    /// - `PendingKeyNotFound`: nothing from `sender` is waiting; poll again
    pub fn request_peer_public_key(
        &self,
        credential: Option<&Credential>,
        sender: Option<&str>,
    ) -> Result<PublicKeyJwk, ExchangeError> {
        let caller = self.authenticate(credential)?;
        let now = self.env.now();

        if let Err(retry_after) = self.limiter.check(&caller, now) {
            tracing::info!(user = %caller, ?retry_after, "Retrieval rate limited");
            return Err(ExchangeError::RateLimited { retry_after });
        }

        let sender = sender
            .ok_or_else(|| ExchangeError::bad_request("sender is required"))
            .and_then(|sender| {
                UserId::new(sender).map_err(|e| ExchangeError::bad_request(format!("sender: {e}")))
            })?;

        match self.store.take_from(&caller, &sender, now) {
            Some(deposit) => {
                if deposit.depositor.is_none() {
                    tracing::warn!(
                        user = %caller,
                        sender = %sender,
                        "Releasing unauthenticated deposit"
                    );
                }
                tracing::debug!(user = %caller, sender = %sender, "Public key retrieved");
                Ok(deposit.public_key)
            },
            None => {
                tracing::debug!(user = %caller, sender = %sender, "No pending key");
                Err(ExchangeError::PendingKeyNotFound { sender })
            },
        }
    }

    /// Purge expired deposits and closed rate-limit windows.
    pub fn sweep(&self) -> SweepReport {
        let now = self.env.now();

        SweepReport {
            expired_deposits: self.store.sweep_expired(now),
            expired_rate_limits: self.limiter.sweep(now),
        }
    }

    /// Number of deposits waiting for their recipient.
    pub fn pending_deposits(&self) -> usize {
        self.store.len()
    }

    fn authenticate(&self, credential: Option<&Credential>) -> Result<UserId, ExchangeError> {
        let Some(credential) = credential else {
            return Err(ExchangeError::Unauthenticated { reason: "missing credential".to_string() });
        };

        self.resolver.resolve(credential).map_err(|e| {
            tracing::info!(error = %e, "Authentication failed");
            ExchangeError::from(e)
        })
    }
}
