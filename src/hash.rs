use crate::error::{DedupError, Result};
use std::io::Cursor;

/// Murmur3 x86_32 over `key` with the given seed.
///
/// Standard tail handling: the trailing `len % 4` bytes form one final block.
/// Hashers that mix every trailing byte as its own block agree only on keys
/// whose length is a multiple of 4.
pub fn murmur3_32(key: &[u8], seed: u32) -> Result<u32> {
    let mut cursor = Cursor::new(key);
    Ok(murmur3::murmur3_32(&mut cursor, seed)?)
}

/// Infinite sequence of non-negative combined hashes for one item.
///
/// Two base hashes are computed, `h1 = murmur3(item, 0)` and
/// `h2 = murmur3(item, h1)`, and element `i` is `h1 + (i + 1) * h2`
/// (Kirsch & Mitzenmacher double hashing) in wrapping signed 32-bit
/// arithmetic. Negative combinations are replaced by their bitwise
/// complement, so every element lies in `[0, i32::MAX]`.
#[derive(Clone, Debug)]
pub struct CombinedHashes {
    h1: i32,
    h2: i32,
    index: i32,
}

impl CombinedHashes {
    pub fn new(item: &[u8]) -> Result<Self> {
        let h1 = murmur3_32(item, 0)? as i32;
        let h2 = murmur3_32(item, h1 as u32)? as i32;
        Ok(Self { h1, h2, index: 0 })
    }
}

impl Iterator for CombinedHashes {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.index = self.index.wrapping_add(1);
        let mut combined = self.h1.wrapping_add(self.index.wrapping_mul(self.h2));
        if combined < 0 {
            combined = !combined;
        }
        Some(combined as u32)
    }
}

/// Fills `buffer` with one combined hash per filter.
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - The stream element.
/// - `buffer: &mut [u32]`
///   - Scratch space; its length is the number of hash functions.
///
/// Reduce a slot modulo the capacity of the matching filter to get a bit
/// position, see [`positions`].
pub fn fill_hash_buffer(item: &[u8], buffer: &mut [u32]) -> Result<()> {
    for (slot, combined) in buffer.iter_mut().zip(CombinedHashes::new(item)?) {
        *slot = combined;
    }
    Ok(())
}

/// Derives one bit position per filter, `position[i] < capacities[i]`.
///
/// Pure and deterministic: identical input yields identical positions on
/// every process and machine.
pub fn positions(item: &[u8], capacities: &[u64]) -> Result<Vec<u64>> {
    if let Some(index) = capacities.iter().position(|&c| c == 0) {
        return Err(DedupError::InvalidArgument(format!(
            "filter {index} has zero capacity"
        )));
    }

    Ok(CombinedHashes::new(item)?
        .zip(capacities)
        .map(|(combined, &capacity)| u64::from(combined) % capacity)
        .collect())
}

/// Number of hash functions for a target false positive probability.
///
/// Arithmetic mean of 1 and `ln(fpp) / ln(1 - 1/e)`, rounded up, as
/// suggested for BSBF-family filters (Bera et al.).
pub fn optimal_num_hash_functions(fpp: f64) -> Result<u32> {
    if !(fpp > 0.0 && fpp < 1.0) {
        return Err(DedupError::InvalidArgument(format!(
            "fpp must be in the range (0, 1), but got {fpp}"
        )));
    }
    let ratio = fpp.ln() / (1.0 - 1.0 / std::f64::consts::E).ln();
    Ok(((ratio + 1.0) / 2.0).ceil() as u32)
}
