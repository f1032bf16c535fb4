//! Approximate de-duplication of unbounded streams in fixed memory.
//!
//! A de-duplicator splits its bit budget into `k` equally sized Bloom filters
//! and classifies every element as DISTINCT (not seen recently) or DUPLICATE.
//! To keep working on an endless stream it evicts random bits as it goes,
//! trading a small false negative rate for a bounded false positive rate.
//!
//! HowTo:
//!    * Hashing: an element is hashed once with Murmur3 and double hashing
//!      yields one bit position per filter.
//!    * Classification: the element is DUPLICATE if its bit is set in every
//!      filter, otherwise it is DISTINCT.
//!    * Insertion: for a DISTINCT element every filter first evicts a random
//!      bit, then sets the element's bit.
//!
//! Variants:
//!     * BSBF: eviction happens on every insertion.
//!     * RLBSBF: eviction happens with probability equal to the filter's load,
//!       and the probability of reporting a duplicate is tracked so the false
//!       positive and false negative rates can be estimated.
//!
//! State is persisted explicitly through [`SerialVersion`]. Version 2 is read
//! and written; version 1 is only read.

pub mod bit_vector;
pub mod dedup;
mod error;
pub mod hash;
pub mod random;

pub use bit_vector::BitVector;
pub use dedup::{
    BsbfDeDuplicator, DeDuplicator, DeDuplicatorConfig,
    DeDuplicatorConfigBuilder, DeDuplicatorStats,
    DuplicateProbabilityEstimator, Persistable, PersistedState,
    RlbsbfDeDuplicator, SerialVersion,
};
pub use error::{DedupError, Result};
pub use hash::{optimal_num_hash_functions, positions};
pub use random::SplitMix64;
