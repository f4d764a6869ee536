//! Fuzz target for RendezvousStore operation sequences
//!
//! Runs arbitrary deposit/take/sweep sequences against the store and a
//! trivial model of it.
//!
//! # Strategy
//!
//! - Overwrites: repeated deposits for the same recipient
//! - Spoofing: take_from naming a sender other than the depositor
//! - Expiry: clock advances across the TTL between operations
//! - Pressure: more recipients than the store's capacity
//!
//! # Invariants
//!
//! - A take returns exactly the latest unexpired deposit, at most once
//! - take_from never releases a deposit made by a different sender
//! - The store never exceeds its capacity

#![no_main]

use std::{
    collections::HashMap,
    sync::OnceLock,
    time::{Duration, Instant},
};

use arbitrary::Arbitrary;
use keyswap_core::{PendingDeposit, RendezvousStore, StoreConfig, StoreOutcome, UserId};
use keyswap_crypto::{KeyPair, PublicKeyJwk};
use libfuzzer_sys::fuzz_target;

const USERS: u8 = 6;
const KEYS: usize = 4;
const TTL: Duration = Duration::from_secs(60);
const CAPACITY: usize = 4;

#[derive(Debug, Arbitrary)]
enum Op {
    Deposit { recipient: u8, depositor: Option<u8>, key: u8 },
    Take { recipient: u8 },
    TakeFrom { recipient: u8, sender: u8 },
    Advance { secs: u8 },
    Sweep,
}

fn keys() -> &'static [PublicKeyJwk] {
    static KEYS_POOL: OnceLock<Vec<PublicKeyJwk>> = OnceLock::new();
    KEYS_POOL.get_or_init(|| (0..KEYS).map(|_| KeyPair::generate().public_key().clone()).collect())
}

fn user(index: u8) -> UserId {
    UserId::new(format!("user-{}", index % USERS)).unwrap()
}

fuzz_target!(|ops: Vec<Op>| {
    let store = RendezvousStore::new(&StoreConfig { shards: 1, capacity: CAPACITY, ttl: TTL });
    let mut model: HashMap<UserId, PendingDeposit<Instant>> = HashMap::new();
    let start = Instant::now();
    let mut now = start;

    for op in ops {
        // Expired entries are invisible to every take
        model.retain(|_, d| now - d.deposited_at < TTL);

        match op {
            Op::Deposit { recipient, depositor, key } => {
                let deposit = PendingDeposit {
                    recipient: user(recipient),
                    depositor: depositor.map(user),
                    public_key: keys()[key as usize % KEYS].clone(),
                    deposited_at: now,
                };
                if store.deposit(deposit.clone()) == StoreOutcome::Evicted {
                    // Model does not track LRU order; resync from the store
                    model.retain(|id, _| store.contains(id));
                }
                model.insert(deposit.recipient.clone(), deposit);
                assert!(store.len() <= CAPACITY);
            },
            Op::Take { recipient } => {
                let recipient = user(recipient);
                let taken = store.take(&recipient, now);
                assert_eq!(taken, model.remove(&recipient));
            },
            Op::TakeFrom { recipient, sender } => {
                let (recipient, sender) = (user(recipient), user(sender));
                let taken = store.take_from(&recipient, &sender, now);

                let matches = model
                    .get(&recipient)
                    .is_some_and(|d| d.depositor.as_ref().is_none_or(|by| *by == sender));
                let expected = if matches { model.remove(&recipient) } else { None };
                assert_eq!(taken, expected);
            },
            Op::Advance { secs } => now += Duration::from_secs(u64::from(secs)),
            Op::Sweep => {
                store.sweep_expired(now);
            },
        }
    }
});
