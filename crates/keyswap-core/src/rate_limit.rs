//! Per-identity retrieval cooldown.
//!
//! Each identity may make one permitted retrieval per cooldown window. The
//! window opens at the last *permitted* attempt: rejected attempts do not
//! push it forward, so a client polling too fast is never locked out for
//! longer than the cooldown.

use std::{collections::HashMap, ops::Sub, time::Duration};

use crate::{identity::UserId, shard::Sharded};

/// Minimum interval between permitted retrievals by the same identity.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Sharded map from identity to its last permitted attempt.
pub struct RateLimiter<I> {
    last_permitted: Sharded<HashMap<UserId, I>>,
    cooldown: Duration,
}

impl<I> RateLimiter<I>
where
    I: Copy + Sub<Output = Duration>,
{
    /// Create a limiter with the given cooldown spread over `shards` locks.
    pub fn new(cooldown: Duration, shards: usize) -> Self {
        Self { last_permitted: Sharded::new(shards, HashMap::new), cooldown }
    }

    /// Configured cooldown.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record an attempt by `user` at `now`.
    ///
    /// Check and update happen under one lock, so of two concurrent attempts
    /// inside one window at most one is permitted.
    ///
    /// # Errors
    ///
    /// Returns the time remaining until the next attempt would be permitted.
    pub fn check(&self, user: &UserId, now: I) -> Result<(), Duration> {
        let mut shard = self.last_permitted.lock(user);

        if let Some(&last) = shard.get(user) {
            let elapsed = now - last;
            if elapsed < self.cooldown {
                return Err(self.cooldown - elapsed);
            }
        }

        shard.insert(user.clone(), now);
        Ok(())
    }

    /// Forget identities whose window has closed. Returns how many were
    /// forgotten.
    ///
    /// Forgetting a closed window never changes a later decision.
    pub fn sweep(&self, now: I) -> usize {
        let mut forgotten = 0;

        self.last_permitted.for_each(|shard| {
            let before = shard.len();
            shard.retain(|_, last| now - *last < self.cooldown);
            forgotten += before - shard.len();
        });

        forgotten
    }

    /// Number of identities currently tracked.
    pub fn len(&self) -> usize {
        let mut total = 0;
        self.last_permitted.for_each(|shard| total += shard.len());
        total
    }

    /// Whether no identity is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
