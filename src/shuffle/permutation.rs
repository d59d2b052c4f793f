use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Use the configured seed, or draw a fresh one from entropy
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Random output slot for every input position: `slots[position] = slot`.
pub fn slot_permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut slots: Vec<usize> = (0..len).collect();
    slots.shuffle(rng);
    slots
}

/// Everything random about a run, derived from one seed
pub struct RunRandomness {
    rng: StdRng,
}

impl RunRandomness {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn slots(&mut self, len: usize) -> Vec<usize> {
        slot_permutation(len, &mut self.rng)
    }

    pub fn worker_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}
