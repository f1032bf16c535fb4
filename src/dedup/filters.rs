use crate::bit_vector::BitVector;
use crate::error::{DedupError, Result};
use crate::hash::{CombinedHashes, fill_hash_buffer};
use crate::random::SplitMix64;
use rand::SeedableRng;

/// How a filter makes room before the hashed bit is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// Clear one random bit unconditionally.
    Uniform,
    /// Clear one random bit with probability equal to the filter's load.
    LoadProportional,
}

/// `k` equally sized filters plus the per-instance transient state.
#[derive(Clone)]
pub(crate) struct PartitionedFilters {
    num_bits: u64,
    num_hash_functions: u32,
    filters: Vec<BitVector>,

    // Transient, rebuilt by `from_parts`.
    hash_buffer: Vec<u32>,
    random: SplitMix64,
}

impl PartitionedFilters {
    pub(crate) fn new(num_bits: u64, num_hash_functions: u32) -> Result<Self> {
        if num_bits == 0 || num_bits > i64::MAX as u64 {
            return Err(DedupError::InvalidArgument(format!(
                "numBits must be in 1..={}, but got {num_bits}",
                i64::MAX
            )));
        }
        if num_hash_functions == 0 || num_hash_functions > i32::MAX as u32 {
            return Err(DedupError::InvalidArgument(format!(
                "numHashFunctions must be in 1..={}, but got {num_hash_functions}",
                i32::MAX
            )));
        }

        let filter_bits = num_bits / u64::from(num_hash_functions);
        let filters = (0..num_hash_functions)
            .map(|_| BitVector::new(filter_bits))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::assemble(num_bits, num_hash_functions, filters))
    }

    /// Rebuilds the transient state around persisted fields.
    pub(crate) fn from_parts(
        num_bits: u64,
        num_hash_functions: u32,
        filters: Vec<BitVector>,
    ) -> Result<Self> {
        if num_bits == 0 || num_hash_functions == 0 {
            return Err(DedupError::Format(format!(
                "non-positive parameters: numBits {num_bits}, \
                 numHashFunctions {num_hash_functions}"
            )));
        }
        if filters.len() != num_hash_functions as usize {
            return Err(DedupError::Format(format!(
                "expected {num_hash_functions} filters, got {}",
                filters.len()
            )));
        }
        let capacity = filters[0].capacity();
        if capacity == 0 || filters.iter().any(|f| f.capacity() != capacity) {
            return Err(DedupError::Format(
                "filters must share one positive capacity".into(),
            ));
        }

        Ok(Self::assemble(num_bits, num_hash_functions, filters))
    }

    fn assemble(
        num_bits: u64,
        num_hash_functions: u32,
        filters: Vec<BitVector>,
    ) -> Self {
        Self {
            num_bits,
            num_hash_functions,
            hash_buffer: vec![0; filters.len()],
            filters,
            random: SplitMix64::seed_from_u64(random_seed(
                num_bits,
                num_hash_functions,
            )),
        }
    }

    pub(crate) fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub(crate) fn num_hash_functions(&self) -> u32 {
        self.num_hash_functions
    }

    pub(crate) fn filters(&self) -> &[BitVector] {
        &self.filters
    }

    pub(crate) fn filter_capacity(&self) -> u64 {
        self.filters[0].capacity()
    }

    pub(crate) fn population_count(&self) -> u64 {
        self.filters.iter().map(BitVector::population_count).sum()
    }

    pub(crate) fn average_load(&self) -> f64 {
        let total: f64 = self.filters.iter().map(BitVector::load_ratio).sum();
        total / self.filters.len() as f64
    }

    /// Hashes `element` into the scratch buffer and reports whether every
    /// hashed bit is already set.
    pub(crate) fn load_hash_buffer(&mut self, element: &[u8]) -> Result<bool> {
        fill_hash_buffer(element, &mut self.hash_buffer)?;
        for (filter, &combined) in self.filters.iter().zip(&self.hash_buffer) {
            if !filter.get(u64::from(combined) % filter.capacity())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Same verdict as [`Self::load_hash_buffer`] without touching any state.
    pub(crate) fn contains(&self, element: &[u8]) -> Result<bool> {
        let hashes = CombinedHashes::new(element)?;
        for (filter, combined) in self.filters.iter().zip(hashes) {
            if !filter.get(u64::from(combined) % filter.capacity())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Records the element currently held in the scratch buffer.
    pub(crate) fn insert_hash_buffer(&mut self, eviction: Eviction) -> Result<()> {
        for (filter, &combined) in self.filters.iter_mut().zip(&self.hash_buffer) {
            let capacity = filter.capacity();
            match eviction {
                Eviction::Uniform => {
                    filter.clear(self.random.next_bounded(capacity))?;
                }
                Eviction::LoadProportional => {
                    if self.random.next_f64() < filter.load_ratio() {
                        filter.clear(self.random.next_bounded(capacity))?;
                    }
                }
            }
            filter.set(u64::from(combined) % capacity)?;
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.clear_all();
        }
    }
}

/// Reproducible seed derived from the construction parameters.
pub(crate) fn random_seed(num_bits: u64, num_hash_functions: u32) -> u64 {
    31u64
        .wrapping_mul(num_bits)
        .wrapping_add(u64::from(num_hash_functions))
}

impl PartialEq for PartitionedFilters {
    fn eq(&self, other: &Self) -> bool {
        self.num_bits == other.num_bits
            && self.num_hash_functions == other.num_hash_functions
            && self.filters == other.filters
    }
}

impl std::fmt::Debug for PartitionedFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "num_bits: {}, num_hash_functions: {}, filter_capacity: {}, \
             population: {}",
            self.num_bits,
            self.num_hash_functions,
            self.filter_capacity(),
            self.population_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sizes() {
        let filters = PartitionedFilters::new(1000, 3).unwrap();
        assert_eq!(filters.filters().len(), 3);
        // 1000 / 3 = 333 bits, rounded up to whole words
        assert!(filters.filters().iter().all(|f| f.capacity() == 384));
    }

    #[test]
    fn test_fewer_bits_than_filters() {
        assert!(matches!(
            PartitionedFilters::new(2, 3),
            Err(DedupError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_seed_derivation() {
        assert_eq!(random_seed(64, 1), 31 * 64 + 1);
        assert_eq!(random_seed(u64::MAX, 0), 31u64.wrapping_mul(u64::MAX));
    }

    #[test]
    fn test_contains_agrees_with_hash_buffer() {
        let mut filters = PartitionedFilters::new(4096, 4).unwrap();
        for i in 0..50 {
            let item = format!("element_{i}");
            let peeked = filters.contains(item.as_bytes()).unwrap();
            assert_eq!(filters.load_hash_buffer(item.as_bytes()).unwrap(), peeked);
            if i % 2 == 0 {
                filters.insert_hash_buffer(Eviction::Uniform).unwrap();
            }
        }
    }

    #[test]
    fn test_from_parts_rejects_mismatched_filters() {
        let filters =
            vec![BitVector::new(64).unwrap(), BitVector::new(128).unwrap()];
        assert!(matches!(
            PartitionedFilters::from_parts(192, 2, filters),
            Err(DedupError::Format(_))
        ));

        let filters = vec![BitVector::new(64).unwrap()];
        assert!(matches!(
            PartitionedFilters::from_parts(128, 2, filters),
            Err(DedupError::Format(_))
        ));
    }

    #[test]
    fn test_load_proportional_never_evicts_from_empty_filter() {
        let mut filters = PartitionedFilters::new(64, 1).unwrap();
        filters.load_hash_buffer(b"first").unwrap();
        filters.insert_hash_buffer(Eviction::LoadProportional).unwrap();
        assert_eq!(filters.population_count(), 1);
    }
}
