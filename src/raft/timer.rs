use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::RaftConfig;

/// Source of randomized election timeouts.
///
/// Each node owns its own generator so that timeouts are independent
/// across nodes and reproducible when a seed is supplied.
#[derive(Debug)]
pub struct ElectionTimer {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
}

impl ElectionTimer {
    pub fn new(min_ms: u64, max_ms: u64, rng: StdRng) -> Self {
        Self { rng, min_ms, max_ms }
    }

    pub fn seeded(min_ms: u64, max_ms: u64, seed: u64) -> Self {
        Self::new(min_ms, max_ms, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &RaftConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(config.election_timeout_min, config.election_timeout_max, rng)
    }

    /// Draws a fresh timeout in `[min, max]` milliseconds.
    pub fn next_timeout(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// True once `timeout` has been strictly exceeded since `since`.
pub fn timeout_elapsed(since: Instant, now: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(since) > timeout
}

/// True when a leader should emit its next heartbeat.
pub fn heartbeat_due(last_sent: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last_sent {
        Some(sent) => now.saturating_duration_since(sent) >= interval,
        None => true,
    }
}
