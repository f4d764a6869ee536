//! Exchange state machine.
//!
//! One [`Exchange`] per peer. It owns a fresh ephemeral key pair, and once the
//! peer's public key arrives, the derived session key.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use keyswap_crypto::{
    EncryptedPayload, KeyPair, PublicKeyJwk, SymmetricKey, decrypt, derive_symmetric_key, encrypt,
};

use crate::{
    error::ClientError,
    event::{ExchangeAction, ExchangeEvent},
};

/// Default wait between polls that found nothing. Matches the relay's
/// retrieval cooldown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default time allowed for the peer's key to arrive.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Which side moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Deposit our key first, then poll for the peer's.
    Initiator,
    /// Poll for the peer's key first, then deposit ours.
    Responder,
}

/// Client exchange configuration.
#[derive(Debug, Clone)]
pub struct ExchangeClientConfig {
    /// Wait between polls that found nothing. Never less than
    /// [`DEFAULT_POLL_INTERVAL`], since faster polls are rate limited.
    pub poll_interval: Duration,
    /// Give up if no peer key has arrived this long after creation
    pub exchange_timeout: Duration,
}

impl Default for ExchangeClientConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_POLL_INTERVAL, exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase<I> {
    Created,
    AwaitingDeposit,
    /// `next_poll_at` is `None` while a poll is in flight.
    AwaitingPeerKey {
        next_poll_at: Option<I>,
    },
    Established,
    Failed,
}

impl<I> Phase<I> {
    fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::AwaitingDeposit => "AwaitingDeposit",
            Self::AwaitingPeerKey { .. } => "AwaitingPeerKey",
            Self::Established => "Established",
            Self::Failed => "Failed",
        }
    }
}

/// Client side of one two-party key exchange.
///
/// Generic over `I` (Instant type) so tests can drive it with a manual clock.
#[derive(Debug)]
pub struct Exchange<I = std::time::Instant> {
    me: String,
    peer: String,
    role: Role,
    config: ExchangeClientConfig,
    key_pair: KeyPair,
    session_key: Option<SymmetricKey>,
    failure: Option<ClientError>,
    phase: Phase<I>,
    started_at: I,
    /// Latest time seen, from creation or a tick.
    now: I,
}

impl<I> Exchange<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create an exchange with a freshly generated ephemeral key pair.
    pub fn new(
        me: impl Into<String>,
        peer: impl Into<String>,
        role: Role,
        config: ExchangeClientConfig,
        now: I,
    ) -> Self {
        Self::with_key_pair(me, peer, role, config, KeyPair::generate(), now)
    }

    /// Create an exchange around an existing key pair.
    pub fn with_key_pair(
        me: impl Into<String>,
        peer: impl Into<String>,
        role: Role,
        mut config: ExchangeClientConfig,
        key_pair: KeyPair,
        now: I,
    ) -> Self {
        config.poll_interval = config.poll_interval.max(DEFAULT_POLL_INTERVAL);

        Self {
            me: me.into(),
            peer: peer.into(),
            role,
            config,
            key_pair,
            session_key: None,
            failure: None,
            phase: Phase::Created,
            started_at: now,
            now,
        }
    }

    /// Our identity.
    pub fn me(&self) -> &str {
        &self.me
    }

    /// Peer identity.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Our role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Our ephemeral public key as JWK text.
    pub fn public_key_jwk(&self) -> &str {
        self.key_pair.public_key().as_str()
    }

    /// Whether the session key is available.
    pub fn is_established(&self) -> bool {
        self.phase == Phase::Established
    }

    /// Why the exchange failed, if it did.
    pub fn error(&self) -> Option<&ClientError> {
        self.failure.as_ref()
    }

    /// Derived session key, once the peer's key has been received.
    pub fn session_key(&self) -> Option<&SymmetricKey> {
        self.session_key.as_ref()
    }

    /// Encrypt for the peer under the session key.
    ///
    /// # Errors
    ///
    /// - `NotEstablished`: no session key yet
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload, ClientError> {
        let key = self.session_key.as_ref().ok_or(ClientError::NotEstablished)?;
        Ok(encrypt(key, plaintext))
    }

    /// Decrypt a payload from the peer.
    ///
    /// # Errors
    ///
    /// - `NotEstablished`: no session key yet
    /// - `Crypto`: payload was tampered with or sealed under another key
    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<Vec<u8>, ClientError> {
        let key = self.session_key.as_ref().ok_or(ClientError::NotEstablished)?;
        Ok(decrypt(key, payload)?)
    }

    /// Process an event and return the actions to perform.
    ///
    /// Ticks are always accepted. Other events must match the current state.
    ///
    /// # Errors
    ///
    /// - `UnexpectedEvent`: event does not apply in the current state. The
    ///   state is unchanged.
    pub fn handle(&mut self, event: ExchangeEvent<I>) -> Result<Vec<ExchangeAction>, ClientError> {
        let event_name = event.name();

        match (self.phase, event) {
            (_, ExchangeEvent::Tick { now }) => Ok(self.handle_tick(now)),
            (Phase::Created, ExchangeEvent::Start) => Ok(match self.role {
                Role::Initiator => self.deposit(),
                Role::Responder => self.poll(),
            }),
            (Phase::AwaitingDeposit, ExchangeEvent::DepositAccepted) => {
                Ok(if self.session_key.is_some() { self.establish() } else { self.poll() })
            },
            (Phase::AwaitingPeerKey { .. }, ExchangeEvent::PeerKeyReceived { public_key_jwk }) => {
                Ok(self.handle_peer_key(&public_key_jwk))
            },
            (Phase::AwaitingPeerKey { .. }, ExchangeEvent::PeerKeyPending) => {
                self.schedule_poll(self.config.poll_interval);
                Ok(Vec::new())
            },
            (Phase::AwaitingPeerKey { .. }, ExchangeEvent::RateLimited { retry_after }) => {
                self.schedule_poll(retry_after);
                Ok(Vec::new())
            },
            (phase, _) => {
                Err(ClientError::UnexpectedEvent { event: event_name, state: phase.name() })
            },
        }
    }

    fn handle_tick(&mut self, now: I) -> Vec<ExchangeAction> {
        if matches!(self.phase, Phase::Established | Phase::Failed) {
            return Vec::new();
        }

        self.now = self.now.max(now);

        let elapsed = self.now - self.started_at;
        if self.session_key.is_none() && elapsed >= self.config.exchange_timeout {
            return self.fail(ClientError::Timeout { elapsed });
        }

        match self.phase {
            Phase::AwaitingPeerKey { next_poll_at: Some(at) } if self.now >= at => self.poll(),
            _ => Vec::new(),
        }
    }

    fn handle_peer_key(&mut self, public_key_jwk: &str) -> Vec<ExchangeAction> {
        let derived = PublicKeyJwk::parse(public_key_jwk)
            .and_then(|peer| derive_symmetric_key(&self.key_pair, &peer));

        match derived {
            Ok(key) => {
                self.session_key = Some(key);
                match self.role {
                    Role::Initiator => self.establish(),
                    Role::Responder => self.deposit(),
                }
            },
            Err(e) => self.fail(e.into()),
        }
    }

    fn deposit(&mut self) -> Vec<ExchangeAction> {
        self.phase = Phase::AwaitingDeposit;
        vec![ExchangeAction::Deposit {
            recipient_id: self.peer.clone(),
            public_key_jwk: self.public_key_jwk().to_string(),
        }]
    }

    fn poll(&mut self) -> Vec<ExchangeAction> {
        self.phase = Phase::AwaitingPeerKey { next_poll_at: None };
        vec![ExchangeAction::Poll { sender_id: self.peer.clone() }]
    }

    // Relative to the latest tick
    fn schedule_poll(&mut self, delay: Duration) {
        self.phase = Phase::AwaitingPeerKey { next_poll_at: Some(self.now + delay) };
    }

    fn establish(&mut self) -> Vec<ExchangeAction> {
        self.phase = Phase::Established;
        vec![ExchangeAction::Established]
    }

    fn fail(&mut self, error: ClientError) -> Vec<ExchangeAction> {
        let reason = error.to_string();
        self.phase = Phase::Failed;
        self.failure = Some(error);
        vec![ExchangeAction::Failed { reason }]
    }
}
