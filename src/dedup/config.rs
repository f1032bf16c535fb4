use crate::error::{DedupError, Result};
use crate::hash::optimal_num_hash_functions;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUM_BITS: u64 = 8 * 1024 * 1024;
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Construction parameters shared by every de-duplicator variant.
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct DeDuplicatorConfig {
    /// Total bit budget, split evenly across the filters
    #[builder(default = "DEFAULT_NUM_BITS")]
    pub num_bits: u64,

    /// Explicit hash function count; derived from the false positive rate
    /// when unset
    #[builder(default, setter(strip_option))]
    pub num_hash_functions: Option<u32>,

    /// Target false positive rate (0.0 to 1.0, exclusive)
    #[builder(default = "DEFAULT_FALSE_POSITIVE_RATE")]
    pub false_positive_rate: f64,
}

impl Default for DeDuplicatorConfig {
    fn default() -> Self {
        Self {
            num_bits: DEFAULT_NUM_BITS,
            num_hash_functions: None,
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
        }
    }
}

impl DeDuplicatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_bits == 0 {
            return Err(DedupError::InvalidArgument(
                "numBits must be positive, but got 0".into(),
            ));
        }
        self.resolve_num_hash_functions().map(|_| ())
    }

    /// The explicit hash function count, or the one derived from the target
    /// false positive rate.
    pub fn resolve_num_hash_functions(&self) -> Result<u32> {
        match self.num_hash_functions {
            Some(0) => Err(DedupError::InvalidArgument(
                "numHashFunctions must be positive, but got 0".into(),
            )),
            Some(k) => Ok(k),
            None => optimal_num_hash_functions(self.false_positive_rate),
        }
    }
}
