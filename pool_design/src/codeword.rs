//! Binary codewords and their assignment to samples.
//!
//! A codeword of length K is stored in the low K bits of a `u64`. Position 0 of the
//! codeword is its leftmost character when rendered, and corresponds to pool 0.
use crate::errors::{AssignmentError, ConfigurationError};
use fxhash::FxHashMap;
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

/// Longest supported codeword, one bit per pool.
pub const MAX_CODEWORD_LENGTH: usize = 64;

/// A fixed-length binary vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Codeword {
    bits: u64,
    len: u8,
}

fn check_length(len: usize) -> Result<(), ConfigurationError> {
    if len == 0 || len > MAX_CODEWORD_LENGTH {
        return Err(ConfigurationError::CodewordLength {
            found: len,
            max: MAX_CODEWORD_LENGTH,
        });
    }
    Ok(())
}

fn length_mask(len: usize) -> u64 {
    if len == MAX_CODEWORD_LENGTH {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

impl Codeword {
    /// Build a codeword from the low `len` bits of `value`, most significant bit first.
    /// Bits above `len` are discarded.
    pub fn from_value(value: u64, len: usize) -> Result<Self, ConfigurationError> {
        check_length(len)?;
        Ok(Codeword {
            bits: value & length_mask(len),
            len: len as u8,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Integer value, reading the codeword left to right as a binary number.
    pub fn value(&self) -> u64 {
        self.bits
    }

    /// Bit at codeword position `pos` (0 is the leftmost character).
    pub fn bit(&self, pos: usize) -> bool {
        assert!(
            pos < self.len(),
            "position {pos} outside codeword of length {}",
            self.len
        );
        (self.bits >> (self.len() - 1 - pos)) & 1 == 1
    }

    /// Positions holding a 1, ascending.
    pub fn ones(self) -> impl Iterator<Item = usize> {
        (0..self.len()).filter(move |&pos| self.bit(pos))
    }

    /// Number of 1 bits (the bit sum).
    pub fn weight(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Number of positions by which two codewords of equal length differ.
    pub fn hamming_distance(&self, other: &Codeword) -> usize {
        assert_eq!(self.len, other.len, "codeword lengths differ");
        (self.bits ^ other.bits).count_ones() as usize
    }

    /// Bitwise complement within the codeword length.
    pub fn complement(&self) -> Codeword {
        Codeword {
            bits: !self.bits & length_mask(self.len()),
            len: self.len,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.bits == 0
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..self.len() {
            f.write_str(if self.bit(pos) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Codeword {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty codeword".to_string());
        }
        if s.len() > MAX_CODEWORD_LENGTH {
            return Err(format!(
                "codeword longer than {MAX_CODEWORD_LENGTH} positions"
            ));
        }
        let mut bits = 0u64;
        for c in s.chars() {
            bits = match c {
                '0' => bits << 1,
                '1' => (bits << 1) | 1,
                _ => return Err(format!("invalid character '{c}' in codeword")),
            };
        }
        Ok(Codeword {
            bits,
            len: s.len() as u8,
        })
    }
}

/// Where sample codewords come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CodewordSource {
    /// Sample `i` gets the binary representation of `i + 1`.
    Sequential,
    /// Codewords taken from a precomputed code, e.g. read with [`read_code_file`].
    Listed(Vec<Codeword>),
}

/// Allowed range of pairwise Hamming distances within a code. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistanceBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl DistanceBounds {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, distance: usize) -> bool {
        self.min.map_or(true, |min| distance >= min)
            && self.max.map_or(true, |max| distance <= max)
    }
}

impl fmt::Display for DistanceBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min}-{max}"),
            (Some(min), None) => write!(f, "at least {min}"),
            (None, Some(max)) => write!(f, "at most {max}"),
            (None, None) => f.write_str("any"),
        }
    }
}

/// Number of codewords of length `len` usable for samples (all but the all-zero one).
pub fn usable_codewords(len: usize) -> u128 {
    (1u128 << len) - 1
}

/// Read a code file with one codeword per line. Lines starting with `#` and blank lines
/// are skipped. Every codeword must have length `len`.
pub fn read_code_file(reader: impl BufRead, len: usize) -> anyhow::Result<Vec<Codeword>> {
    let mut codes = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let code = text
            .parse::<Codeword>()
            .map_err(|reason| AssignmentError::BadCodeword {
                line: i + 1,
                text: text.to_string(),
                reason,
            })?;
        if code.len() != len {
            return Err(AssignmentError::BadCodeword {
                line: i + 1,
                text: text.to_string(),
                reason: format!("expected a codeword of length {len}, found {}", code.len()),
            }
            .into());
        }
        codes.push(code);
    }
    Ok(codes)
}

/// Number of codewords at each bit sum.
pub fn bit_sum_counts(codes: &[Codeword]) -> BTreeMap<usize, usize> {
    codes.iter().map(Codeword::weight).counts().into_iter().collect()
}

/// Smallest Hamming distance over all pairs, or None for fewer than two codewords.
pub fn min_pairwise_distance(codes: &[Codeword]) -> Option<usize> {
    codes
        .iter()
        .tuple_combinations()
        .map(|(a, b)| a.hamming_distance(b))
        .min()
}

/// Keep `n` codewords of a listed code. The all-zero codeword is dropped, then the
/// lowest-weight codewords are kept, in file order.
fn reduce_to_number(codes: &[Codeword], n: usize) -> Vec<Codeword> {
    let mut keep: Vec<(usize, Codeword)> = codes
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, c)| !c.is_zero())
        .collect();
    if keep.len() > n {
        keep.sort_by_key(|&(i, c)| (c.weight(), i));
        keep.truncate(n);
        keep.sort_by_key(|&(i, _)| i);
    }
    keep.into_iter().map(|(_, c)| c).collect()
}

/// Attach a unique codeword of length `len` to each of `num_samples` samples.
pub fn assign_codewords(
    num_samples: usize,
    len: usize,
    source: &CodewordSource,
) -> Result<Vec<Codeword>, crate::errors::PoolingError> {
    check_length(len)?;
    if (num_samples as u128) > usable_codewords(len) {
        return Err(AssignmentError::CodeSpaceExhausted {
            num_samples,
            codeword_length: len,
            available: usable_codewords(len),
        }
        .into());
    }

    let codewords = match source {
        CodewordSource::Sequential => (0..num_samples)
            .map(|i| Codeword::from_value(i as u64 + 1, len))
            .collect::<Result<Vec<_>, _>>()?,
        CodewordSource::Listed(codes) => {
            if let Some(bad) = codes.iter().find(|c| c.len() != len) {
                return Err(AssignmentError::BadCodeword {
                    line: 0,
                    text: bad.to_string(),
                    reason: format!("expected a codeword of length {len}"),
                }
                .into());
            }
            let nonzero = codes.iter().copied().enumerate().filter(|(_, c)| !c.is_zero());
            if let Some((first, second, codeword)) = first_duplicate(nonzero) {
                return Err(AssignmentError::DuplicateInCode {
                    first,
                    second,
                    codeword,
                }
                .into());
            }
            let chosen = reduce_to_number(codes, num_samples);
            if chosen.len() < num_samples {
                return Err(AssignmentError::CodeSpaceExhausted {
                    num_samples,
                    codeword_length: len,
                    available: chosen.len() as u128,
                }
                .into());
            }
            chosen
        }
    };

    check_unique(&codewords)?;
    debug!("assigned {} codewords of length {len}", codewords.len());
    if let Some(d) = min_pairwise_distance(&codewords) {
        info!(
            "codeword bit sums {:?}, minimum pairwise Hamming distance {d}",
            bit_sum_counts(&codewords)
        );
    }
    Ok(codewords)
}

/// First repeated codeword among `(index, codeword)` entries, with both indices.
fn first_duplicate(
    entries: impl IntoIterator<Item = (usize, Codeword)>,
) -> Option<(usize, usize, Codeword)> {
    let mut seen = FxHashMap::default();
    for (i, code) in entries {
        if let Some(&first) = seen.get(&code) {
            return Some((first, i, code));
        }
        seen.insert(code, i);
    }
    None
}

/// Fail if two codewords in the list are equal.
pub fn check_unique(codewords: &[Codeword]) -> Result<(), AssignmentError> {
    match first_duplicate(codewords.iter().copied().enumerate()) {
        Some((first, second, codeword)) => Err(AssignmentError::DuplicateCodeword {
            first,
            second,
            codeword,
        }),
        None => Ok(()),
    }
}

/// Fail if any pair of `codes` is closer or further apart than `bounds` allows.
pub fn check_distances(
    codes: &[Codeword],
    bounds: DistanceBounds,
) -> Result<(), AssignmentError> {
    if bounds.is_unbounded() {
        return Ok(());
    }
    for ((first, a), (second, b)) in codes.iter().copied().enumerate().tuple_combinations() {
        let distance = a.hamming_distance(&b);
        if !bounds.contains(distance) {
            return Err(AssignmentError::DistanceOutOfRange {
                first,
                second,
                a,
                b,
                distance,
                bounds,
            });
        }
    }
    Ok(())
}
