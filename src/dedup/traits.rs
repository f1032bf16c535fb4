use crate::error::Result;

/// Classifies stream elements as distinct (first seen) or duplicate.
pub trait DeDuplicator {
    /// Total bit budget the classifier was created with.
    fn num_bits(&self) -> u64;

    /// Number of hash functions, equal to the number of filters.
    fn num_hash_functions(&self) -> u32;

    /// Classifies `element` and records it into the history.
    ///
    /// Returns `true` if the element is reported distinct.
    fn classify_distinct(&mut self, element: &[u8]) -> Result<bool>;

    /// Classifies `element` without recording it.
    fn peek_distinct(&self, element: &[u8]) -> Result<bool>;

    /// Forgets the whole history.
    fn reset(&mut self);
}

/// Analytic accuracy estimates derived from the current filter state.
pub trait DuplicateProbabilityEstimator {
    /// Probability that a distinct element is reported as duplicate, given the
    /// probability that the next element is actually distinct.
    fn estimate_fpp(&self, actually_distinct_probability: f64) -> f64;

    /// Probability that a duplicate element is reported as distinct, given the
    /// probability that the next element is actually distinct.
    fn estimate_fnp(&self, actually_distinct_probability: f64) -> f64;
}

pub trait DeDuplicatorStats {
    fn filter_capacity(&self) -> u64;
    fn population_count(&self) -> u64;
    fn average_load(&self) -> f64;
}
