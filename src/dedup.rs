//! Stream de-duplicators built on partitioned Bloom filters with eviction
pub mod bsbf;
pub mod config;
mod filters;
pub mod rlbsbf;
pub mod serializer;
pub mod traits;

pub use bsbf::BsbfDeDuplicator;
pub use config::{
    DEFAULT_FALSE_POSITIVE_RATE, DEFAULT_NUM_BITS, DeDuplicatorConfig,
    DeDuplicatorConfigBuilder, DeDuplicatorConfigBuilderError,
};
pub use rlbsbf::RlbsbfDeDuplicator;
pub use serializer::{Persistable, PersistedState, SerialVersion};
pub use traits::{DeDuplicator, DeDuplicatorStats, DuplicateProbabilityEstimator};
