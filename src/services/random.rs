use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of the random offsets used for recommendation backfill
pub trait RandomSource: Send + Sync {
    /// Uniform draw from `0..=max`
    fn offset_up_to(&self, max: u64) -> u64;
}

/// Draws from the thread-local generator, a fresh value on every call
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn offset_up_to(&self, max: u64) -> u64 {
        rand::thread_rng().gen_range(0..=max)
    }
}

/// Deterministic generator; the same seed replays the same offsets
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn offset_up_to(&self, max: u64) -> u64 {
        self.rng.lock().gen_range(0..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_repeatable() {
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);
        let first: Vec<u64> = (0..20).map(|_| a.offset_up_to(95)).collect();
        let second: Vec<u64> = (0..20).map(|_| b.offset_up_to(95)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_draws_stay_in_range() {
        let random = SeededRandom::new(1);
        for _ in 0..500 {
            assert!(random.offset_up_to(3) <= 3);
        }
        assert_eq!(ThreadRandom.offset_up_to(0), 0);
    }
}
