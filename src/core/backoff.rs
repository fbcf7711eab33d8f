use crate::domain::ports::Backoff;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Uniform random delay in `[min, max)`.
pub struct JitterBackoff {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl JitterBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence of delays, for tests.
    pub fn with_seed(min: Duration, max: Duration, seed: u64) -> Self {
        Self {
            min,
            max,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

impl Backoff for JitterBackoff {
    fn delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_micros() as u64;
        let max = self.max.as_micros() as u64;
        let micros = self.rng.lock().random_range(min..max);
        Duration::from_micros(micros)
    }
}

impl std::fmt::Debug for JitterBackoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitterBackoff")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self) -> Duration {
        self.0
    }
}

/// Retries immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self) -> Duration {
        Duration::ZERO
    }
}
