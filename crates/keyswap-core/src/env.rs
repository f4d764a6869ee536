//! Environment abstraction for deterministic testing.
//!
//! Decouples exchange logic from system time. Production uses the real clock;
//! tests use [`ManualEnv`] and advance time explicitly, so cooldown and TTL
//! behavior is checked without sleeping.

use std::{
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Abstract environment providing time.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock_secs()` is seconds since the Unix epoch
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Current wall clock time, used for credential expiry.
    fn wall_clock_secs(&self) -> u64;
}

/// Manually driven clock.
///
/// Starts at a fixed wall clock time and only moves when
/// [`advance`](Self::advance) is called. Clones share the same clock.
#[derive(Clone, Debug)]
pub struct ManualEnv {
    origin: Instant,
    wall_origin_secs: u64,
    elapsed_millis: Arc<AtomicU64>,
}

impl ManualEnv {
    /// Wall clock reading at creation, in seconds since the Unix epoch.
    pub const DEFAULT_WALL_CLOCK_SECS: u64 = 1_700_000_000;

    /// Create a clock at [`Self::DEFAULT_WALL_CLOCK_SECS`].
    pub fn new() -> Self {
        Self::starting_at(Self::DEFAULT_WALL_CLOCK_SECS)
    }

    /// Create a clock whose wall clock reads `wall_clock_secs`.
    #[allow(clippy::disallowed_methods)]
    pub fn starting_at(wall_clock_secs: u64) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin_secs: wall_clock_secs,
            elapsed_millis: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis.load(Ordering::SeqCst))
    }
}

impl Default for ManualEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for ManualEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn wall_clock_secs(&self) -> u64 {
        self.wall_origin_secs + self.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_time_only_moves_on_advance() {
        let env = ManualEnv::new();

        let t1 = env.now();
        let t2 = env.now();
        assert_eq!(t1, t2);

        env.advance(Duration::from_secs(3));
        assert_eq!(env.now() - t1, Duration::from_secs(3));
        assert_eq!(env.wall_clock_secs(), ManualEnv::DEFAULT_WALL_CLOCK_SECS + 3);
    }

    #[test]
    fn clones_share_the_clock() {
        let env = ManualEnv::new();
        let other = env.clone();

        env.advance(Duration::from_millis(1500));

        assert_eq!(env.now(), other.now());
    }
}
