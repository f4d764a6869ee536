//! End-to-end exchange between two client state machines
//!
//! Both sides run against one in-process coordinator with a manual clock.
//! The test plays the transport: it performs each action against the
//! coordinator and feeds the answer back as an event.

use std::{collections::VecDeque, time::Duration};

use keyswap_client::{
    ClientError, Exchange, ExchangeAction, ExchangeClientConfig, ExchangeEvent, Role,
};
use keyswap_core::{
    Credential, DepositRequest, Environment, ExchangeConfig, ExchangeCoordinator, ExchangeError,
    HmacTokenResolver, ManualEnv, UserId,
};

const SECRET: &[u8] = b"client-flow-secret-long-enough";
const STEP: Duration = Duration::from_secs(1);

type Coordinator = ExchangeCoordinator<ManualEnv, HmacTokenResolver<ManualEnv>>;

struct Party {
    exchange: Exchange,
    token: Credential,
    queue: VecDeque<ExchangeAction>,
    polls: usize,
}

impl Party {
    fn new(
        env: &ManualEnv,
        issuer: &HmacTokenResolver<ManualEnv>,
        me: &str,
        peer: &str,
        role: Role,
    ) -> Self {
        let token = issuer.issue(&UserId::new(me).unwrap(), Duration::from_secs(3600)).unwrap();
        let exchange = Exchange::new(me, peer, role, ExchangeClientConfig::default(), env.now());
        Self { exchange, token, queue: VecDeque::new(), polls: 0 }
    }

    fn feed(&mut self, event: ExchangeEvent) {
        let actions = self.exchange.handle(event).unwrap();
        self.queue.extend(actions);
    }

    // Perform queued actions until the party is waiting on the clock
    fn drain(&mut self, coordinator: &Coordinator) {
        while let Some(action) = self.queue.pop_front() {
            if let Some(event) = self.perform(coordinator, action) {
                self.feed(event);
            }
        }
    }

    fn perform(
        &mut self,
        coordinator: &Coordinator,
        action: ExchangeAction,
    ) -> Option<ExchangeEvent> {
        match action {
            ExchangeAction::Deposit { recipient_id, public_key_jwk } => {
                coordinator
                    .submit_public_key(
                        Some(&self.token),
                        DepositRequest::new(recipient_id, public_key_jwk),
                    )
                    .unwrap();
                Some(ExchangeEvent::DepositAccepted)
            },
            ExchangeAction::Poll { sender_id } => {
                self.polls += 1;
                match coordinator.request_peer_public_key(Some(&self.token), Some(&sender_id)) {
                    Ok(key) => {
                        Some(ExchangeEvent::PeerKeyReceived { public_key_jwk: key.into_string() })
                    },
                    Err(ExchangeError::PendingKeyNotFound { .. }) => {
                        Some(ExchangeEvent::PeerKeyPending)
                    },
                    Err(ExchangeError::RateLimited { retry_after }) => {
                        Some(ExchangeEvent::RateLimited { retry_after })
                    },
                    Err(e) => panic!("unexpected relay error: {e}"),
                }
            },
            ExchangeAction::Established | ExchangeAction::Failed { .. } => None,
        }
    }
}

fn setup() -> (ManualEnv, Coordinator, HmacTokenResolver<ManualEnv>) {
    let env = ManualEnv::new();
    let users = || ["alice", "bob"].map(|id| UserId::new(id).unwrap());
    let resolver = HmacTokenResolver::new(env.clone(), SECRET, users());
    let issuer = HmacTokenResolver::new(env.clone(), SECRET, users());
    let coordinator = ExchangeCoordinator::new(env.clone(), resolver, ExchangeConfig::default());
    (env, coordinator, issuer)
}

fn run(env: &ManualEnv, coordinator: &Coordinator, parties: &mut [&mut Party], max_steps: usize) {
    for party in parties.iter_mut() {
        party.feed(ExchangeEvent::Start);
    }

    for _ in 0..max_steps {
        for party in parties.iter_mut() {
            party.drain(coordinator);
        }
        if parties.iter().all(|p| p.exchange.is_established() || p.exchange.error().is_some()) {
            return;
        }

        env.advance(STEP);
        for party in parties.iter_mut() {
            party.feed(ExchangeEvent::Tick { now: env.now() });
        }
    }
}

#[test]
fn initiator_and_responder_agree_on_key() {
    let (env, coordinator, issuer) = setup();
    let mut alice = Party::new(&env, &issuer, "alice", "bob", Role::Initiator);
    let mut bob = Party::new(&env, &issuer, "bob", "alice", Role::Responder);

    run(&env, &coordinator, &mut [&mut alice, &mut bob], 60);

    assert!(alice.exchange.is_established());
    assert!(bob.exchange.is_established());
    assert_eq!(alice.exchange.session_key(), bob.exchange.session_key());

    let sealed = alice.exchange.encrypt(b"hello bob").unwrap();
    assert_eq!(bob.exchange.decrypt(&sealed).unwrap(), b"hello bob");
    assert_eq!(coordinator.pending_deposits(), 0);
}

#[test]
fn responder_started_first_waits_for_initiator() {
    let (env, coordinator, issuer) = setup();
    let mut bob = Party::new(&env, &issuer, "bob", "alice", Role::Responder);
    bob.feed(ExchangeEvent::Start);
    bob.drain(&coordinator);

    // Bob polls a few times before Alice shows up
    for _ in 0..12 {
        env.advance(STEP);
        bob.feed(ExchangeEvent::Tick { now: env.now() });
        bob.drain(&coordinator);
    }
    assert!(!bob.exchange.is_established());
    assert!(bob.polls >= 3);

    let mut alice = Party::new(&env, &issuer, "alice", "bob", Role::Initiator);
    run_started(&env, &coordinator, &mut alice, &mut bob);

    assert!(alice.exchange.is_established());
    assert!(bob.exchange.is_established());
    assert_eq!(alice.exchange.session_key(), bob.exchange.session_key());
}

// Bob is already mid-poll; only Alice needs starting
fn run_started(env: &ManualEnv, coordinator: &Coordinator, alice: &mut Party, bob: &mut Party) {
    alice.feed(ExchangeEvent::Start);
    for _ in 0..60 {
        alice.drain(coordinator);
        bob.drain(coordinator);
        if alice.exchange.is_established() && bob.exchange.is_established() {
            return;
        }
        env.advance(STEP);
        alice.feed(ExchangeEvent::Tick { now: env.now() });
        bob.feed(ExchangeEvent::Tick { now: env.now() });
    }
}

#[test]
fn lone_initiator_times_out() {
    let (env, coordinator, issuer) = setup();
    let mut alice = Party::new(&env, &issuer, "alice", "bob", Role::Initiator);

    run(&env, &coordinator, &mut [&mut alice], 120);

    assert!(matches!(alice.exchange.error(), Some(ClientError::Timeout { .. })));
    // Polled once per cooldown, never rate limited into a tighter loop
    assert!(alice.polls <= 13);
}
