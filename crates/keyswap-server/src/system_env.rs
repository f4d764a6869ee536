//! Production Environment implementation using system time.
//!
//! `SystemEnv` reads the real monotonic clock for cooldowns and deposit TTLs,
//! and the system wall clock for credential expiry. Production timing is
//! therefore non-deterministic; tests use `ManualEnv` instead.

use keyswap_core::Environment;

/// Production environment using system time.
///
/// # Panics
///
/// [`wall_clock_secs`](Environment::wall_clock_secs) panics if the system
/// clock reads earlier than the Unix epoch. Credential expiry cannot be
/// judged against such a clock.
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    #[allow(clippy::expect_used)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)")
            .as_secs()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn wall_clock_is_after_2023() {
        // 2023-11-14, well before any plausible test run
        assert!(SystemEnv::new().wall_clock_secs() > 1_700_000_000);
    }
}
