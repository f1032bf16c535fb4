//! Versioned binary persistence for de-duplicator state.
//!
//! All multi-byte fields are big-endian.
//!
//! V1 (read only):
//!
//! ```text
//! u8 version = 1 | i64 num_bits | i32 k | k x bit vector
//! ```
//!
//! V2:
//!
//! ```text
//! i32 version = 2 | i64 num_bits | i32 k | k x bit vector | f64 X
//! ```
//!
//! A bit vector is an `i32` word count followed by that many `u64` words.
use super::traits::DeDuplicator;
use crate::bit_vector::BitVector;
use crate::error::{DedupError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Upper bound on filters preallocated before they are actually read.
const PREALLOCATED_FILTERS: usize = 64;

/// Persisted field set, decoded but not yet bound to a de-duplicator.
#[derive(Clone, Debug, PartialEq)]
pub struct PersistedState {
    pub num_bits: u64,
    pub num_hash_functions: u32,
    pub filters: Vec<BitVector>,
    /// Estimator state; zero for variants without an estimator.
    pub duplicate_probability: f64,
}

impl PersistedState {
    /// Checks that the estimator state is a probability.
    pub fn validate_duplicate_probability(&self) -> Result<()> {
        let x = self.duplicate_probability;
        if !(0.0..=1.0).contains(&x) {
            return Err(DedupError::Format(format!(
                "Reported duplicate probability {x} is not in [0, 1]"
            )));
        }
        Ok(())
    }
}

/// A de-duplicator whose state can be written and restored by
/// [`SerialVersion`].
pub trait Persistable: DeDuplicator + Sized {
    fn persisted_filters(&self) -> &[BitVector];

    fn persisted_duplicate_probability(&self) -> f64 {
        0.0
    }

    /// Binds decoded state to a new instance, rebuilding the scratch buffer
    /// and reseeding the generator.
    fn rehydrate(state: PersistedState) -> Result<Self>;

    /// Replaces `self` with the state read from `input`. On error `self` is
    /// left untouched.
    fn load_from<R: Read>(
        &mut self,
        version: SerialVersion,
        input: &mut R,
    ) -> Result<()> {
        *self = version.read_from(input)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SerialVersion {
    /// Legacy layout, can only be read.
    V1,
    V2,
}

impl SerialVersion {
    pub fn number(self) -> u32 {
        match self {
            SerialVersion::V1 => 1,
            SerialVersion::V2 => 2,
        }
    }

    /// Writes the state of `dedup` to `out` as a single record.
    pub fn write_to<D, W>(self, dedup: &D, out: &mut W) -> Result<()>
    where
        D: Persistable,
        W: Write,
    {
        let bytes = self.to_bytes(dedup)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    pub fn to_bytes<D: Persistable>(self, dedup: &D) -> Result<Vec<u8>> {
        match self {
            SerialVersion::V1 => {
                warn!("refusing to write de-duplicator in legacy version 1 format");
                Err(DedupError::UnsupportedOperation(
                    "Writing version 1 de-duplicator state is no longer supported"
                        .into(),
                ))
            }
            SerialVersion::V2 => encode_v2(dedup),
        }
    }

    /// Reads one record and binds it to a new de-duplicator.
    pub fn read_from<D, R>(self, input: &mut R) -> Result<D>
    where
        D: Persistable,
        R: Read,
    {
        let state = self.read_state(input)?;
        debug!(
            version = self.number(),
            num_bits = state.num_bits,
            num_hash_functions = state.num_hash_functions,
            "loaded de-duplicator state"
        );
        D::rehydrate(state)
    }

    pub fn from_bytes<D: Persistable>(self, mut bytes: &[u8]) -> Result<D> {
        self.read_from(&mut bytes)
    }

    /// Decodes one record without binding it to a de-duplicator.
    pub fn read_state<R: Read>(self, input: &mut R) -> Result<PersistedState> {
        match self {
            SerialVersion::V1 => {
                let tag = input.read_u8()?;
                if u32::from(tag) != self.number() {
                    return Err(DedupError::unexpected_version(tag, self.number()));
                }
                let (num_bits, num_hash_functions, filters) = read_filters(input)?;
                Ok(PersistedState {
                    num_bits,
                    num_hash_functions,
                    filters,
                    duplicate_probability: 0.0,
                })
            }
            SerialVersion::V2 => {
                let tag = input.read_i32::<BigEndian>()?;
                if tag != self.number() as i32 {
                    return Err(DedupError::unexpected_version(tag, self.number()));
                }
                let (num_bits, num_hash_functions, filters) = read_filters(input)?;
                let state = PersistedState {
                    num_bits,
                    num_hash_functions,
                    filters,
                    duplicate_probability: input.read_f64::<BigEndian>()?,
                };
                state.validate_duplicate_probability()?;
                Ok(state)
            }
        }
    }
}

fn encode_v2<D: Persistable>(dedup: &D) -> Result<Vec<u8>> {
    let filters = dedup.persisted_filters();
    let words: usize = filters.iter().map(BitVector::num_words).sum();
    let mut out =
        Vec::with_capacity(4 + 8 + 4 + filters.len() * 4 + words * 8 + 8);

    out.write_i32::<BigEndian>(SerialVersion::V2.number() as i32)?;
    out.write_i64::<BigEndian>(dedup.num_bits() as i64)?;
    out.write_i32::<BigEndian>(dedup.num_hash_functions() as i32)?;
    for filter in filters {
        filter.write_to(&mut out)?;
    }
    out.write_f64::<BigEndian>(dedup.persisted_duplicate_probability())?;

    debug!(
        num_bits = dedup.num_bits(),
        num_hash_functions = dedup.num_hash_functions(),
        bytes = out.len(),
        "encoded de-duplicator state as version 2"
    );
    Ok(out)
}

fn read_filters<R: Read>(input: &mut R) -> Result<(u64, u32, Vec<BitVector>)> {
    let num_bits = input.read_i64::<BigEndian>()?;
    let num_hash_functions = input.read_i32::<BigEndian>()?;
    if num_bits <= 0 || num_hash_functions <= 0 {
        return Err(DedupError::Format(format!(
            "Non-positive parameters: numBits {num_bits}, \
             numHashFunctions {num_hash_functions}"
        )));
    }

    let num_filters = num_hash_functions as usize;
    let mut filters = Vec::with_capacity(num_filters.min(PREALLOCATED_FILTERS));
    for _ in 0..num_filters {
        filters.push(BitVector::read_from(input)?);
    }
    Ok((num_bits as u64, num_hash_functions as u32, filters))
}
