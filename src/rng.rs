//! The process-wide deterministic pseudo-random source, seeded to the
//! fixed value `1337` at startup and consumed only through
//! [`Scalar::random01`].
//!
//! The original seeds a `std::mt19937`; we reach for `rand_chacha::ChaCha8Rng`
//! instead (as `examples/tachyon-beep-murk`'s workspace does for its
//! deterministic-simulation needs) rather than hand-rolling a Mersenne
//! Twister. Reproducibility here means two runs with the same scalar types,
//! same seed, and same input produce identical field sequences within this
//! implementation, not bit-compatibility with the original C++ binary's
//! random stream, so substituting a different well-distributed generator of
//! the same seed is a faithful implementation choice, recorded in
//! DESIGN.md.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fixed seed for the simulator's single pseudo-random source.
pub const SEED: u64 = 1337;

/// Construct the simulator's single pseudo-random source.
pub fn new_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}
