//! De-duplication with a Randomized Load Balanced Biased Sampling based Bloom
//! Filter (RLBSBF), from the same paper as [`super::bsbf`].
//!
//! Eviction is load proportional: a distinct element resets a random bit of
//! filter `i` only with probability `L(i) / s`, the fraction of ones in that
//! filter. This keeps the filters evenly loaded and makes the probability of
//! reporting a duplicate tractable, which the de-duplicator tracks after every
//! classification.
use super::config::DeDuplicatorConfig;
use super::filters::{Eviction, PartitionedFilters};
use super::serializer::{Persistable, PersistedState};
use super::traits::{
    DeDuplicator, DeDuplicatorStats, DuplicateProbabilityEstimator,
};
use crate::bit_vector::BitVector;
use crate::error::Result;
use crate::hash::optimal_num_hash_functions;
use tracing::debug;

#[derive(Clone, PartialEq)]
pub struct RlbsbfDeDuplicator {
    filters: PartitionedFilters,
    reported_duplicate_probability: f64,
}

impl RlbsbfDeDuplicator {
    pub fn new(num_bits: u64, num_hash_functions: u32) -> Result<Self> {
        let filters = PartitionedFilters::new(num_bits, num_hash_functions)?;
        debug!(
            num_bits,
            num_hash_functions,
            filter_capacity = filters.filter_capacity(),
            "created RLBSBF de-duplicator"
        );
        Ok(Self {
            filters,
            reported_duplicate_probability: 0.0,
        })
    }

    /// Derives the hash function count from a target false positive rate.
    pub fn with_false_positive_rate(num_bits: u64, fpp: f64) -> Result<Self> {
        Self::new(num_bits, optimal_num_hash_functions(fpp)?)
    }

    pub fn from_config(config: &DeDuplicatorConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.num_bits, config.resolve_num_hash_functions()?)
    }

    pub fn filters(&self) -> &[BitVector] {
        self.filters.filters()
    }

    /// Current estimate of the probability that an element is reported as
    /// duplicate.
    pub fn reported_duplicate_probability(&self) -> f64 {
        self.reported_duplicate_probability
    }

    fn update_reported_duplicate_probability(&mut self) {
        // X' = [ X^(1/K) * { X + (1 - X) * (1 - L / S^2) } + (1 - X) / S ]^K
        let k = f64::from(self.filters.num_hash_functions());
        let l = self.filters.average_load();
        let s = self.filters.filter_capacity() as f64;
        let x = self.reported_duplicate_probability;

        let retained = x.powf(1.0 / k) * (x + (1.0 - x) * (1.0 - l / (s * s)));
        let fresh = (1.0 - x) / s;
        self.reported_duplicate_probability =
            (retained + fresh).powf(k).clamp(0.0, 1.0);
    }
}

impl DeDuplicator for RlbsbfDeDuplicator {
    fn num_bits(&self) -> u64 {
        self.filters.num_bits()
    }

    fn num_hash_functions(&self) -> u32 {
        self.filters.num_hash_functions()
    }

    fn classify_distinct(&mut self, element: &[u8]) -> Result<bool> {
        // Algorithm 4 of the paper.
        let is_distinct = !self.filters.load_hash_buffer(element)?;
        if is_distinct {
            self.filters.insert_hash_buffer(Eviction::LoadProportional)?;
        }
        self.update_reported_duplicate_probability();
        Ok(is_distinct)
    }

    fn peek_distinct(&self, element: &[u8]) -> Result<bool> {
        Ok(!self.filters.contains(element)?)
    }

    fn reset(&mut self) {
        self.filters.reset();
        self.reported_duplicate_probability = 0.0;
        debug!(num_bits = self.filters.num_bits(), "reset RLBSBF de-duplicator");
    }
}

impl DuplicateProbabilityEstimator for RlbsbfDeDuplicator {
    fn estimate_fpp(&self, actually_distinct_probability: f64) -> f64 {
        let p = actually_distinct_probability.clamp(0.0, 1.0);
        p * self.reported_duplicate_probability
    }

    fn estimate_fnp(&self, actually_distinct_probability: f64) -> f64 {
        let p = actually_distinct_probability.clamp(0.0, 1.0);
        (1.0 - p) * (1.0 - self.reported_duplicate_probability)
    }
}

impl DeDuplicatorStats for RlbsbfDeDuplicator {
    fn filter_capacity(&self) -> u64 {
        self.filters.filter_capacity()
    }

    fn population_count(&self) -> u64 {
        self.filters.population_count()
    }

    fn average_load(&self) -> f64 {
        self.filters.average_load()
    }
}

impl Persistable for RlbsbfDeDuplicator {
    fn persisted_filters(&self) -> &[BitVector] {
        self.filters.filters()
    }

    fn persisted_duplicate_probability(&self) -> f64 {
        self.reported_duplicate_probability
    }

    fn rehydrate(state: PersistedState) -> Result<Self> {
        state.validate_duplicate_probability()?;
        let filters = PartitionedFilters::from_parts(
            state.num_bits,
            state.num_hash_functions,
            state.filters,
        )?;
        Ok(Self {
            filters,
            reported_duplicate_probability: state.duplicate_probability,
        })
    }
}

impl std::fmt::Debug for RlbsbfDeDuplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RlbsbfDeDuplicator {{ {:?}, reported_duplicate_probability: {} }}",
            self.filters, self.reported_duplicate_probability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DedupError;

    #[test]
    fn test_first_update_from_empty_state() {
        // X = 0 and L = 0 leave only the (1 - X) / S term: X' = (1/S)^K.
        let mut dedup = RlbsbfDeDuplicator::new(128, 2).unwrap();
        dedup.update_reported_duplicate_probability();
        let expected = (1.0f64 / 64.0).powi(2);
        assert!((dedup.reported_duplicate_probability() - expected).abs() < 1e-15);
    }

    fn with_state(
        num_bits: u64,
        filter_words: Vec<u64>,
        duplicate_probability: f64,
    ) -> RlbsbfDeDuplicator {
        let filters = filter_words
            .into_iter()
            .map(|word| BitVector::from_words(vec![word]).unwrap())
            .collect::<Vec<_>>();
        RlbsbfDeDuplicator::rehydrate(PersistedState {
            num_bits,
            num_hash_functions: filters.len() as u32,
            filters,
            duplicate_probability,
        })
        .unwrap()
    }

    #[test]
    fn test_update_from_loaded_state() {
        // K = 2, S = 64, loads 16/64 and 32/64 so L = 0.375, X = 0.25:
        // (0.5 * (0.25 + 0.75 * (1 - 0.375 / 4096)) + 0.75 / 64)^2
        let mut dedup = with_state(128, vec![0xFFFF, 0xFFFF_FFFF], 0.25);
        assert_eq!(dedup.average_load(), 0.375);
        dedup.update_reported_duplicate_probability();
        let x = dedup.reported_duplicate_probability();
        assert!((x - 0.261_820_943_342_172_54).abs() < 1e-12, "X = {x}");
    }

    #[test]
    fn test_update_is_clamped_to_one() {
        // K = 100, X = 0.5, L = 0: the unclamped value is about 1.0947.
        let mut dedup = with_state(6400, vec![0; 100], 0.5);
        dedup.update_reported_duplicate_probability();
        assert_eq!(dedup.reported_duplicate_probability(), 1.0);
        assert_eq!(dedup.estimate_fpp(0.5), 0.5);
        assert_eq!(dedup.estimate_fnp(0.5), 0.0);
    }

    #[test]
    fn test_rehydrate_rejects_invalid_probability() {
        for x in [f64::NAN, 5.0, -3.0, f64::INFINITY] {
            let result = RlbsbfDeDuplicator::rehydrate(PersistedState {
                num_bits: 64,
                num_hash_functions: 1,
                filters: vec![BitVector::new(64).unwrap()],
                duplicate_probability: x,
            });
            assert!(matches!(result, Err(DedupError::Format(_))), "X = {x}");
        }
        for x in [0.0, 0.5, 1.0] {
            assert_eq!(
                with_state(64, vec![0], x).reported_duplicate_probability(),
                x
            );
        }
    }

    #[test]
    fn test_probability_updates_on_duplicates_too() {
        let mut dedup = RlbsbfDeDuplicator::new(64, 1).unwrap();
        assert!(dedup.classify_distinct(b"same").unwrap());
        let after_first = dedup.reported_duplicate_probability();
        assert!(!dedup.classify_distinct(b"same").unwrap());
        assert_ne!(dedup.reported_duplicate_probability(), after_first);
    }

    #[test]
    fn test_estimates_use_reported_probability() {
        let mut dedup = RlbsbfDeDuplicator::new(256, 2).unwrap();
        for i in 0..100 {
            dedup.classify_distinct(format!("{i}").as_bytes()).unwrap();
        }
        let x = dedup.reported_duplicate_probability();
        assert!(x > 0.0 && x <= 1.0);
        assert_eq!(dedup.estimate_fpp(0.25), 0.25 * x);
        assert_eq!(dedup.estimate_fnp(0.25), 0.75 * (1.0 - x));
    }
}
