//! Fixed-capacity bit storage with a maintained population count.
//!
//! Bits live in 64-bit words (`BitVec<u64, Lsb0>`), so bit `i` is bit
//! `i % 64` of word `i / 64`. The capacity is always a whole number of words.
use crate::error::{DedupError, Result};
use bitvec::{order::Lsb0, vec::BitVec};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const WORD_BITS: u64 = u64::BITS as u64;
const MAX_WORDS: u64 = i32::MAX as u64;
// Upper bound for speculative allocation while reading untrusted input.
const READ_CHUNK_WORDS: usize = 1 << 16;

#[derive(Clone)]
pub struct BitVector {
    bits: BitVec<u64, Lsb0>,
    population: u64,
}

impl BitVector {
    /// Allocates a zeroed vector holding at least `num_bits` bits.
    pub fn new(num_bits: u64) -> Result<Self> {
        let num_words = num_words(num_bits)?;
        Ok(Self {
            bits: BitVec::from_vec(vec![0u64; num_words]),
            population: 0,
        })
    }

    /// Wraps existing words, recomputing the population count.
    pub fn from_words(words: Vec<u64>) -> Result<Self> {
        if words.is_empty() || words.len() as u64 > MAX_WORDS {
            return Err(DedupError::InvalidArgument(format!(
                "Word count must be in 1..={MAX_WORDS}, but got {}",
                words.len()
            )));
        }
        let bits = BitVec::from_vec(words);
        let population = bits.count_ones() as u64;
        Ok(Self { bits, population })
    }

    pub fn get(&self, index: u64) -> Result<bool> {
        let idx = self.checked_index(index)?;
        Ok(self.bits[idx])
    }

    /// Sets the bit, returning `true` only if it was previously clear.
    pub fn set(&mut self, index: u64) -> Result<bool> {
        let idx = self.checked_index(index)?;
        let was_set = self.bits.replace(idx, true);
        if !was_set {
            self.population += 1;
        }
        Ok(!was_set)
    }

    /// Clears the bit, returning `true` only if it was previously set.
    pub fn clear(&mut self, index: u64) -> Result<bool> {
        let idx = self.checked_index(index)?;
        let was_set = self.bits.replace(idx, false);
        if was_set {
            self.population -= 1;
        }
        Ok(was_set)
    }

    pub fn clear_all(&mut self) {
        self.bits.fill(false);
        self.population = 0;
    }

    pub fn capacity(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn population_count(&self) -> u64 {
        self.population
    }

    /// Fraction of set bits, in `[0, 1]`.
    pub fn load_ratio(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            capacity => self.population as f64 / capacity as f64,
        }
    }

    pub fn num_words(&self) -> usize {
        self.bits.as_raw_slice().len()
    }

    pub fn words(&self) -> &[u64] {
        self.bits.as_raw_slice()
    }

    /// ORs `other` into `self` word by word.
    pub fn merge_or(&mut self, other: &BitVector) -> Result<()> {
        if self.num_words() != other.num_words() {
            return Err(DedupError::InvalidArgument(format!(
                "BitVectors must be of equal length ({} != {})",
                self.num_words(),
                other.num_words()
            )));
        }

        let mut population = 0u64;
        for (word, other_word) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.words())
        {
            *word |= *other_word;
            population += u64::from(word.count_ones());
        }
        self.population = population;
        Ok(())
    }

    /// Writes the word count followed by every word, big-endian.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let words = self.words();
        out.write_i32::<BigEndian>(words.len() as i32)?;
        for &word in words {
            out.write_u64::<BigEndian>(word)?;
        }
        Ok(())
    }

    /// Reads the layout produced by [`BitVector::write_to`]. The population
    /// count is recomputed from the words rather than trusted.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let num_words = input.read_i32::<BigEndian>()?;
        if num_words <= 0 {
            return Err(DedupError::Format(format!(
                "Non-positive bit vector word count {num_words}"
            )));
        }

        let num_words = num_words as usize;
        let mut words = Vec::with_capacity(num_words.min(READ_CHUNK_WORDS));
        for _ in 0..num_words {
            words.push(input.read_u64::<BigEndian>()?);
        }
        Self::from_words(words)
    }

    fn checked_index(&self, index: u64) -> Result<usize> {
        let capacity = self.capacity();
        if index >= capacity {
            return Err(DedupError::IndexOutOfBounds { index, capacity });
        }
        Ok(index as usize)
    }
}

fn num_words(num_bits: u64) -> Result<usize> {
    if num_bits == 0 {
        return Err(DedupError::InvalidArgument(
            "numBits must be positive, but got 0".into(),
        ));
    }
    let num_words = num_bits.div_ceil(WORD_BITS);
    if num_words > MAX_WORDS {
        return Err(DedupError::InvalidArgument(format!(
            "Cannot allocate enough space for {num_bits} bits"
        )));
    }
    Ok(num_words as usize)
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.words() == other.words()
    }
}

impl Eq for BitVector {}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitVector {{ capacity: {}, population: {} }}",
            self.capacity(),
            self.population
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bits_rejected() {
        assert!(matches!(
            BitVector::new(0),
            Err(DedupError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_word_count_upper_bound() {
        assert!(matches!(
            BitVector::new(64 * MAX_WORDS + 1),
            Err(DedupError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bits_land_in_expected_word() {
        let mut bits = BitVector::new(128).unwrap();
        bits.set(0).unwrap();
        bits.set(65).unwrap();
        bits.set(127).unwrap();
        assert_eq!(bits.words(), &[1u64, 2u64 | (1u64 << 63)]);
    }

    #[test]
    fn test_from_words_counts_population() {
        let bits = BitVector::from_words(vec![u64::MAX, 0b1011]).unwrap();
        assert_eq!(bits.capacity(), 128);
        assert_eq!(bits.population_count(), 67);
    }

    #[test]
    fn test_clear_all() {
        let mut bits = BitVector::new(64).unwrap();
        bits.set(3).unwrap();
        bits.set(9).unwrap();
        bits.clear_all();
        assert_eq!(bits.population_count(), 0);
        assert!(bits.words().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_from_words_rejects_empty() {
        assert!(matches!(
            BitVector::from_words(Vec::new()),
            Err(DedupError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_non_positive_word_count_is_format_error() {
        for count in [-1i32, 0] {
            let bytes = count.to_be_bytes();
            let result = BitVector::read_from(&mut &bytes[..]);
            assert!(matches!(result, Err(DedupError::Format(_))), "{count}");
        }
    }

    #[test]
    fn test_truncated_input_is_io_error() {
        let mut bytes = 2i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&7u64.to_be_bytes());
        let result = BitVector::read_from(&mut &bytes[..]);
        assert!(matches!(result, Err(DedupError::Io(_))));
    }
}
