//! Turning pool membership into liquid transfers.
use crate::errors::ConfigurationError;
use crate::plate::WellPosition;
use crate::scheme::{Direction, Pool, Sample};
use serde::Serialize;

/// Most pipetting operations one contribution may be split into.
pub const MAX_OPERATIONS_PER_CONTRIBUTION: usize = 1000;

/// Relative slack when deciding whether a volume is an exact multiple of the
/// single-transfer maximum.
const SPLIT_TOLERANCE: f64 = 1e-9;

/// Decimal places kept when printing volumes.
const VOLUME_DECIMALS: usize = 6;

/// Render a volume in ul with at most six decimals and no trailing zeros, so that
/// sums like 2.2 + 2.2 + 2.2 print as `6.6`.
pub fn format_volume(ul: f64) -> String {
    let text = format!("{:.*}", VOLUME_DECIMALS, ul);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-0" => "0".to_string(),
        _ => text.to_string(),
    }
}

/// Fewest operations of at most `max` ul that move `volume` ul.
fn split_count(volume: f64, max: f64) -> Result<usize, ConfigurationError> {
    if volume <= max {
        return Ok(1);
    }
    let ratio = volume / max;
    let nearest = ratio.round();
    let operations = if (nearest * max - volume).abs() <= SPLIT_TOLERANCE * volume {
        nearest
    } else {
        ratio.ceil()
    };
    if operations > MAX_OPERATIONS_PER_CONTRIBUTION as f64 {
        return Err(ConfigurationError::TooManyOperations {
            transfer_volume: volume,
            max_single_transfer: max,
            limit: MAX_OPERATIONS_PER_CONTRIBUTION,
        });
    }
    Ok(operations as usize)
}

/// How much liquid each sample contributes to each of its pools, and how much a single
/// pipetting operation may move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumePolicy {
    /// Volume in ul moved from a sample into each pool it belongs to.
    transfer_volume: f64,
    /// Largest volume in ul a single pipetting operation can move. Larger contributions
    /// are split into equal sub-transfers. None means no limit.
    max_single_transfer: Option<f64>,
    operations_per_contribution: usize,
}

impl VolumePolicy {
    pub fn new(
        transfer_volume: f64,
        max_single_transfer: Option<f64>,
    ) -> Result<Self, ConfigurationError> {
        if !transfer_volume.is_finite() || transfer_volume <= 0.0 {
            return Err(ConfigurationError::NonPositiveVolume {
                what: "volume per transfer",
                found: transfer_volume,
            });
        }
        let operations_per_contribution = match max_single_transfer {
            Some(max) if !max.is_finite() || max <= 0.0 => {
                return Err(ConfigurationError::NonPositiveVolume {
                    what: "maximum volume per transfer",
                    found: max,
                });
            }
            Some(max) => split_count(transfer_volume, max)?,
            None => 1,
        };
        Ok(VolumePolicy {
            transfer_volume,
            max_single_transfer,
            operations_per_contribution,
        })
    }

    pub fn transfer_volume(&self) -> f64 {
        self.transfer_volume
    }

    pub fn max_single_transfer(&self) -> Option<f64> {
        self.max_single_transfer
    }

    /// Number of pipetting operations needed for one contribution.
    pub fn operations_per_contribution(&self) -> usize {
        self.operations_per_contribution
    }
}

impl Default for VolumePolicy {
    fn default() -> Self {
        VolumePolicy {
            transfer_volume: 20.0,
            max_single_transfer: None,
            operations_per_contribution: 1,
        }
    }
}

/// One logical movement of liquid from a sample well into a pool well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub sample: usize,
    pub pool: usize,
    pub source: WellPosition,
    pub destination: WellPosition,
    /// Physical pipetting operations.
    pub count: usize,
    /// Total volume in ul over all `count` operations.
    pub volume: f64,
}

impl Transfer {
    /// Volume moved by each of the `count` pipetting operations.
    pub fn volume_per_operation(&self) -> f64 {
        self.volume / self.count as f64
    }
}

/// Running totals for one sample or one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    /// Number of transfer records.
    pub records: usize,
    /// Physical pipetting operations.
    pub count: usize,
    /// ul
    pub volume: f64,
}

impl Tally {
    /// The tally with `transfer` added, or None if a count overflows.
    pub fn checked_add(&self, transfer: &Transfer) -> Option<Tally> {
        Some(Tally {
            records: self.records.checked_add(1)?,
            count: self.count.checked_add(transfer.count)?,
            volume: self.volume + transfer.volume,
        })
    }
}

/// All transfers for one direction, with the planner's own per-sample and per-pool totals.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    pub direction: Direction,
    pub transfers: Vec<Transfer>,
    pub sample_tallies: Vec<Tally>,
    pub pool_tallies: Vec<Tally>,
}

fn add_to(
    tallies: &mut [Tally],
    index: usize,
    transfer: &Transfer,
    direction: Direction,
    side: &'static str,
) -> Result<(), ConfigurationError> {
    tallies[index] = tallies[index]
        .checked_add(transfer)
        .ok_or(ConfigurationError::TallyOverflow {
            direction,
            side,
            index,
        })?;
    Ok(())
}

/// One transfer for every (sample, pool) pair where the sample is a member of the pool,
/// ordered by sample and then pool. Samples in no pool get no transfers.
pub fn plan_transfers(
    samples: &[Sample],
    pools: &[Pool],
    direction: Direction,
    policy: &VolumePolicy,
) -> Result<TransferPlan, ConfigurationError> {
    let count = policy.operations_per_contribution();
    let mut sample_tallies = vec![Tally::default(); samples.len()];
    let mut pool_tallies = vec![Tally::default(); pools.len()];
    let mut transfers = Vec::new();

    for sample in samples {
        for pool in pools.iter().filter(|p| p.member_mask[sample.index]) {
            let transfer = Transfer {
                sample: sample.index,
                pool: pool.index,
                source: sample.source.clone(),
                destination: pool.destination.clone(),
                count,
                volume: policy.transfer_volume(),
            };
            add_to(&mut sample_tallies, sample.index, &transfer, direction, "sample")?;
            add_to(&mut pool_tallies, pool.index, &transfer, direction, "pool")?;
            transfers.push(transfer);
        }
    }

    Ok(TransferPlan {
        direction,
        transfers,
        sample_tallies,
        pool_tallies,
    })
}
