//! Samples, pools and the pooling scheme derived from sample codewords.
use crate::codeword::Codeword;
use crate::errors::{ConfigurationError, ConsistencyError, PoolingError};
use crate::plate::WellPosition;
use log::warn;
use serde::Serialize;
use std::fmt;

/// Which of the two pool sets a pool or transfer belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Primary,
    /// Pools built from the complemented codewords.
    Mirror,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Primary => "primary",
            Direction::Mirror => "mirror",
        })
    }
}

/// A source sample and the codewords that decide which pools it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub index: usize,
    pub source: WellPosition,
    pub codeword: Codeword,
    pub mirror_codeword: Option<Codeword>,
}

impl Sample {
    /// The codeword used for pools in `direction`, None for the mirror direction of a
    /// sample built without a mirror codeword.
    pub fn codeword_for(&self, direction: Direction) -> Option<Codeword> {
        match direction {
            Direction::Primary => Some(self.codeword),
            Direction::Mirror => self.mirror_codeword,
        }
    }
}

/// Build the samples, attaching mirror codewords (the complements) when `mirror` is set.
pub fn make_samples(
    sources: Vec<WellPosition>,
    codewords: &[Codeword],
    mirror: bool,
) -> Vec<Sample> {
    assert_eq!(sources.len(), codewords.len());
    sources
        .into_iter()
        .zip(codewords)
        .enumerate()
        .map(|(index, (source, &codeword))| Sample {
            index,
            source,
            codeword,
            mirror_codeword: mirror.then(|| codeword.complement()),
        })
        .collect()
}

/// A pool: the destination well that receives every sample whose codeword has a 1 at
/// position `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub index: usize,
    pub direction: Direction,
    pub destination: WellPosition,
    pub member_mask: Vec<bool>,
}

impl Pool {
    /// Number of member samples.
    pub fn weight(&self) -> usize {
        self.member_mask.iter().filter(|&&m| m).count()
    }

    /// Indices of member samples, ascending.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.member_mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
    }

    /// The pooling scheme: one character per sample, `1` for members.
    pub fn scheme(&self) -> String {
        self.member_mask
            .iter()
            .map(|&m| if m { '1' } else { '0' })
            .collect()
    }
}

/// Derive one pool per codeword position from the sample codewords of `direction`.
/// Pool `j` is placed at `destinations[j]`.
pub fn derive_pools(
    samples: &[Sample],
    codeword_length: usize,
    direction: Direction,
    destinations: &[WellPosition],
) -> Result<Vec<Pool>, PoolingError> {
    if destinations.len() < codeword_length {
        return Err(ConfigurationError::TooFewDestinations {
            direction,
            num_pools: codeword_length,
            num_positions: destinations.len(),
        }
        .into());
    }
    let codewords = samples
        .iter()
        .map(|s| {
            s.codeword_for(direction)
                .ok_or(ConsistencyError::MissingMirrorCodeword { sample: s.index })
        })
        .collect::<Result<Vec<Codeword>, _>>()?;

    let pools: Vec<Pool> = destinations[..codeword_length]
        .iter()
        .enumerate()
        .map(|(index, destination)| Pool {
            index,
            direction,
            destination: destination.clone(),
            member_mask: codewords.iter().map(|c| c.bit(index)).collect(),
        })
        .collect();

    for pool in &pools {
        let weight = pool.weight();
        if weight == 0 {
            warn!("{direction} pool {} receives no samples", pool.index);
        } else if weight == samples.len() && samples.len() > 1 {
            warn!("{direction} pool {} receives every sample", pool.index);
        }
    }
    Ok(pools)
}
