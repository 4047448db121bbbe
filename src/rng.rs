//! Minimal PCG32 generator for arrival-time jitter.
//!
//! Entity arrival delays are a scheduling perturbation, not protocol state,
//! so a full `rand` dependency is not warranted. This is the PCG-XSH-RR
//! variant with 64-bit state: small, statistically solid, and deterministic
//! from a seed so a test run's interleaving pressure is reproducible.
//!
//! Reference: <https://www.pcg-random.org/>

/// Default increment for single-stream PCG32, from the PCG paper.
const PCG_DEFAULT_INCREMENT: u64 = 1442695040888963407;

/// Standard multiplier for 64-bit state PCG.
const PCG_MULTIPLIER: u64 = 6364136223846793005;

/// PCG32 random number generator. Not cryptographically secure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    /// Seeds a generator on the default stream.
    #[must_use]
    pub const fn seed_from_u64(seed: u64) -> Self {
        // Standard PCG seeding: advance once from zero state, add the seed,
        // advance again.
        let inc = PCG_DEFAULT_INCREMENT | 1;
        let mut state = 0u64;
        state = state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(inc);
        state = state.wrapping_add(seed);
        state = state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(inc);
        Self { state, inc }
    }

    /// Generates the next 32-bit value.
    #[inline]
    #[must_use]
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.inc);
        // XSH-RR output permutation
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform value in `[0, bound)`. Returns 0 for a zero bound.
    ///
    /// Uses rejection sampling to avoid modulo bias; jitter does not strictly
    /// need that, but the loop almost never iterates and exactness is free.
    #[must_use]
    pub fn gen_range(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let value = self.next_u32();
            if value >= threshold {
                return value % bound;
            }
        }
    }
}
