//! Rendezvous store for pending public-key deposits.
//!
//! One slot per recipient identity. A deposit fills (or replaces) the slot;
//! a take empties it. Reading and removing happen under the same shard lock,
//! so of any number of concurrent takes for one slot at most one observes the
//! deposit.
//!
//! ```text
//! Empty ──deposit──► Pending ──take──► Empty
//!                     │   ▲
//!                     └───┘ deposit (replace payload)
//! ```
//!
//! Slots expire after a TTL and the store is bounded: the capacity is split
//! across shards (never more shards than slots) and a full shard evicts its
//! oldest deposit when a new recipient arrives.

use std::{
    collections::{HashMap, VecDeque},
    ops::Sub,
    time::Duration,
};

use keyswap_crypto::PublicKeyJwk;

use crate::{identity::UserId, shard::Sharded};

/// Rendezvous store sizing and expiry.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of independently locked shards
    pub shards: usize,
    /// Maximum number of pending deposits across all shards
    pub capacity: usize,
    /// How long a deposit waits for its recipient before it is dropped
    pub ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { shards: 16, capacity: 10_000, ttl: Duration::from_secs(300) }
    }
}

/// A public key waiting for its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeposit<I> {
    /// Who the key is for (the slot key)
    pub recipient: UserId,
    /// Authenticated identity of the depositor. `None` for unauthenticated
    /// deposits.
    pub depositor: Option<UserId>,
    /// The deposited public key
    pub public_key: PublicKeyJwk,
    /// When the deposit was made
    pub deposited_at: I,
}

/// Result of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Slot was empty and is now pending.
    Stored,
    /// Slot was pending; its payload was replaced.
    Replaced,
    /// Slot was stored and another recipient's slot was evicted for room.
    Evicted,
}

struct StoreShard<I> {
    /// Pending deposits indexed by recipient.
    entries: HashMap<UserId, PendingDeposit<I>>,
    /// Deposit order, oldest at front.
    order: VecDeque<UserId>,
    /// Maximum entries in this shard.
    capacity: usize,
}

impl<I> StoreShard<I> {
    fn new(capacity: usize) -> Self {
        Self { entries: HashMap::new(), order: VecDeque::new(), capacity }
    }

    fn remove(&mut self, recipient: &UserId) -> Option<PendingDeposit<I>> {
        let entry = self.entries.remove(recipient);
        if entry.is_some() {
            self.order.retain(|id| id != recipient);
        }
        entry
    }
}

/// Process-wide map from recipient identity to its pending deposit.
pub struct RendezvousStore<I> {
    shards: Sharded<StoreShard<I>>,
    ttl: Duration,
}

impl<I> RendezvousStore<I>
where
    I: Copy + Sub<Output = Duration>,
{
    /// Create an empty store.
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = config.capacity.max(1);
        let shard_count = config.shards.clamp(1, capacity);
        let (base, extra) = (capacity / shard_count, capacity % shard_count);

        // The first `extra` shards take one more slot so the sum is `capacity`
        let mut index = 0;
        let shards = Sharded::new(shard_count, || {
            let slots = base + usize::from(index < extra);
            index += 1;
            StoreShard::new(slots)
        });

        Self { shards, ttl: config.ttl }
    }

    /// Deposit a public key for `deposit.recipient`.
    ///
    /// Unconditional upsert: replaces any pending deposit for the same
    /// recipient (last writer wins). Replacing never evicts another slot.
    pub fn deposit(&self, deposit: PendingDeposit<I>) -> StoreOutcome {
        let recipient = deposit.recipient.clone();
        let mut shard = self.shards.lock(&recipient);

        if shard.remove(&recipient).is_some() {
            shard.entries.insert(recipient.clone(), deposit);
            shard.order.push_back(recipient);
            return StoreOutcome::Replaced;
        }

        let outcome = if shard.entries.len() >= shard.capacity {
            match shard.order.pop_front() {
                Some(oldest) => {
                    shard.entries.remove(&oldest);
                    StoreOutcome::Evicted
                },
                None => StoreOutcome::Stored,
            }
        } else {
            StoreOutcome::Stored
        };

        shard.entries.insert(recipient.clone(), deposit);
        shard.order.push_back(recipient);

        outcome
    }

    /// Atomically take the deposit for `recipient`, whoever made it.
    ///
    /// Returns `None` if the slot is empty or its deposit has expired.
    pub fn take(&self, recipient: &UserId, now: I) -> Option<PendingDeposit<I>> {
        let mut shard = self.shards.lock(recipient);
        let entry = shard.remove(recipient)?;

        (!self.is_expired(&entry, now)).then_some(entry)
    }

    /// Atomically take the deposit for `recipient` only if `sender` made it.
    ///
    /// A deposit recorded without a depositor matches any sender. A deposit by
    /// someone else is left in place and `None` is returned. Expired deposits
    /// are dropped and never returned.
    pub fn take_from(
        &self,
        recipient: &UserId,
        sender: &UserId,
        now: I,
    ) -> Option<PendingDeposit<I>> {
        let mut shard = self.shards.lock(recipient);
        let entry = shard.entries.get(recipient)?;

        if self.is_expired(entry, now) {
            shard.remove(recipient);
            return None;
        }

        if entry.depositor.as_ref().is_some_and(|depositor| depositor != sender) {
            return None;
        }

        shard.remove(recipient)
    }

    /// Drop every expired deposit. Returns how many were dropped.
    pub fn sweep_expired(&self, now: I) -> usize {
        let mut dropped = 0;

        self.shards.for_each(|shard| {
            let before = shard.entries.len();
            shard.entries.retain(|_, entry| now - entry.deposited_at < self.ttl);
            if shard.entries.len() != before {
                let entries = &shard.entries;
                shard.order.retain(|id| entries.contains_key(id));
                dropped += before - shard.entries.len();
            }
        });

        dropped
    }

    /// Whether a deposit is pending for `recipient` (expired or not).
    ///
    /// # Concurrency
    ///
    /// The answer may be stale as soon as it is returned. Use
    /// [`take`](Self::take) to consume atomically.
    pub fn contains(&self, recipient: &UserId) -> bool {
        self.shards.lock(recipient).entries.contains_key(recipient)
    }

    /// Number of pending deposits.
    pub fn len(&self) -> usize {
        let mut total = 0;
        self.shards.for_each(|shard| total += shard.entries.len());
        total
    }

    /// Whether no deposits are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &PendingDeposit<I>, now: I) -> bool {
        now - entry.deposited_at >= self.ttl
    }
}
