//! Shared random source for rolls and human-like delays.
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::policy::roll;

/// Cloneable handle to one seeded random stream.
///
/// Every component that draws (policy, pacing worker, follow-ups,
/// reactions) shares the same stream so a seed reproduces a whole run.
#[derive(Clone, Debug)]
pub struct Jitter {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl Jitter {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::from_entropy())),
        }
    }

    /// Run `f` with exclusive access to the underlying generator.
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha20Rng) -> T) -> T {
        let mut guard = self.rng.lock();
        f(&mut guard)
    }

    /// True with probability `p`.
    #[must_use]
    pub fn chance(&self, p: f64) -> bool {
        self.with(|rng| roll(rng, p))
    }

    /// `base_ms` plus a uniform draw from `[0, spread_ms)`.
    #[must_use]
    pub fn delay(&self, base_ms: u64, spread_ms: u64) -> Duration {
        let extra = if spread_ms == 0 {
            0
        } else {
            self.with(|rng| rng.gen_range(0..spread_ms))
        };
        Duration::from_millis(base_ms.saturating_add(extra))
    }

    /// Uniform draw from `[min_ms, max_ms)`; `min_ms` when the window is empty.
    #[must_use]
    pub fn between(&self, min_ms: u64, max_ms: u64) -> Duration {
        self.delay(min_ms, max_ms.saturating_sub(min_ms))
    }

    /// Uniform pick from a pool.
    #[must_use]
    pub fn pick<'a, T>(&self, pool: &'a [T]) -> Option<&'a T> {
        if pool.is_empty() {
            return None;
        }
        let idx = self.with(|rng| rng.gen_range(0..pool.len()));
        pool.get(idx)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::from_entropy()
    }
}
