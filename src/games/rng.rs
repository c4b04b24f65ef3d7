//! Randomness helpers shared by the games
//!
//! Every game is generic over `rand::Rng`; live tables use an entropy-seeded
//! `StdRng`, tests and the simulator use fixed seeds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// In-place Fisher–Yates shuffle, walking from the back of the slice.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn from_entropy() -> StdRng {
    StdRng::from_entropy()
}

/// Independent generator derived from `rng`, for draws that must not
/// disturb the parent stream's later values beyond this one call.
pub fn fork<R: Rng + ?Sized>(rng: &mut R) -> StdRng {
    StdRng::seed_from_u64(rng.gen())
}
