//! Deterministic SplitMix64 generator.
//!
//! Produces the same stream as the JDK's `SplittableRandom` for a given seed,
//! including its bounded-draw rejection loop and 53-bit doubles, so eviction
//! choices are reproducible from construction parameters alone.
use rand::{RngCore, SeedableRng};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;
const DOUBLE_UNIT: f64 = 1.0 / (1u64 << 53) as f64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Uniform draw in `[0, bound)`. `bound` must lie in `1..=i64::MAX`.
    pub fn next_bounded(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0 && bound <= i64::MAX as u64);
        let bound = bound as i64;
        let mut r = self.next_long();
        let m = bound - 1;
        if bound & m == 0 {
            return (r & m) as u64;
        }
        let mut u = ((r as u64) >> 1) as i64;
        loop {
            r = u % bound;
            if u.wrapping_add(m).wrapping_sub(r) >= 0 {
                return r as u64;
            }
            u = ((self.next_long() as u64) >> 1) as i64;
        }
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_mixed() >> 11) as f64 * DOUBLE_UNIT
    }

    fn next_seed(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        self.state
    }

    fn next_mixed(&mut self) -> u64 {
        let seed = self.next_seed();
        mix64(seed)
    }

    fn next_long(&mut self) -> i64 {
        self.next_mixed() as i64
    }
}

fn mix64(z: u64) -> u64 {
    let z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    let z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn mix32(z: u64) -> u32 {
    let z = (z ^ (z >> 33)).wrapping_mul(0x62a9_d9ed_7997_05f5);
    ((z ^ (z >> 28)).wrapping_mul(0xcb24_d0a5_c88c_35b3) >> 32) as u32
}

impl RngCore for SplitMix64 {
    fn next_u32(&mut self) -> u32 {
        let seed = self.next_seed();
        mix32(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.next_mixed()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_mixed().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for SplitMix64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
