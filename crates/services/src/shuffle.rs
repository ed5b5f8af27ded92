use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Injected randomness for question and option shuffles.
///
/// `seeded` makes every shuffle reproducible, which the tests rely on.
#[derive(Debug)]
pub struct ShuffleSource {
    rng: Mutex<StdRng>,
}

impl ShuffleSource {
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform in-place Fisher–Yates shuffle.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        items.shuffle(&mut *rng);
    }
}

impl Default for ShuffleSource {
    fn default() -> Self {
        Self::from_os_rng()
    }
}
