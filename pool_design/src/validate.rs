//! Independent recount of a pooling plan, and the totals reported for it.
use crate::codeword::Codeword;
use crate::errors::ConsistencyError;
use crate::plan::PoolingPlan;
use crate::scheme::{Direction, Pool, Sample};
use crate::transfer::{format_volume, Tally, TransferPlan};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Relative tolerance when comparing volume sums accumulated in different orders.
const VOLUME_TOLERANCE: f64 = 1e-9;

fn volumes_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= VOLUME_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Range and total of physical transfers and volume over a set of samples or pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TransferStats {
    pub min_count: usize,
    pub max_count: usize,
    pub min_volume: f64,
    pub max_volume: f64,
    pub total_count: usize,
    pub total_volume: f64,
}

impl TransferStats {
    pub fn from_tallies(tallies: &[Tally]) -> Self {
        let counts = || tallies.iter().map(|t| t.count);
        let min_count = counts().min().unwrap_or(0);
        let max_count = counts().max().unwrap_or(0);
        let (min_volume, max_volume) = tallies
            .iter()
            .map(|t| t.volume)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 0.0));
        TransferStats {
            min_count,
            max_count,
            min_volume,
            max_volume,
            total_count: tallies.iter().map(|t| t.count).sum(),
            total_volume: tallies.iter().map(|t| t.volume).sum(),
        }
    }
}

/// One line of the summary footer, e.g.
/// `transfers into pools: 4-4 per pool (80-80 ul), total 12 transfers`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsLine<'a> {
    pub label: &'a str,
    pub unit: &'a str,
    pub stats: &'a TransferStats,
}

impl fmt::Display for StatsLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        write!(
            f,
            "{}: {}-{} per {} ({}-{} ul), total {} transfers",
            self.label,
            s.min_count,
            s.max_count,
            self.unit,
            format_volume(s.min_volume),
            format_volume(s.max_volume),
            s.total_count
        )
    }
}

/// Recounted totals for one direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionSummary {
    pub direction: Direction,
    pub sample_tallies: Vec<Tally>,
    pub pool_tallies: Vec<Tally>,
    pub from_samples: TransferStats,
    pub into_pools: TransferStats,
}

/// Totals for the whole plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub num_samples: usize,
    pub num_pools: usize,
    pub num_mirror_pools: usize,
    pub primary: DirectionSummary,
    pub mirror: Option<DirectionSummary>,
}

fn stats_line(label: &str, unit: &str, stats: &TransferStats) -> String {
    StatsLine { label, unit, stats }.to_string()
}

impl PlanSummary {
    /// The summary footer lines, in report order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Total {} samples into {} pools (and {} mirror pools)",
            self.num_samples, self.num_pools, self.num_mirror_pools
        )];
        lines.push(stats_line(
            "transfers from samples",
            "sample",
            &self.primary.from_samples,
        ));
        if let Some(mirror) = &self.mirror {
            lines.push(stats_line(
                "mirror transfers from samples",
                "sample",
                &mirror.from_samples,
            ));
        }
        lines.push(stats_line("transfers into pools", "pool", &self.primary.into_pools));
        if let Some(mirror) = &self.mirror {
            lines.push(stats_line(
                "transfers into mirror pools",
                "pool",
                &mirror.into_pools,
            ));
        }
        lines
    }
}

/// A plan that passed [`validate`]. Emitters only accept this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    plan: PoolingPlan,
    summary: PlanSummary,
}

impl ValidatedPlan {
    pub fn plan(&self) -> &PoolingPlan {
        &self.plan
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }

    /// Transfers of `direction`, or None if the plan has no mirror design.
    pub fn transfers(&self, direction: Direction) -> Option<&TransferPlan> {
        match direction {
            Direction::Primary => Some(&self.plan.sample_transfers),
            Direction::Mirror => self.plan.mirror_transfers.as_ref(),
        }
    }
}

fn check_direction(
    samples: &[Sample],
    pools: &[Pool],
    plan: &TransferPlan,
) -> Result<DirectionSummary, ConsistencyError> {
    let direction = plan.direction;

    let codewords = samples
        .iter()
        .map(|s| {
            s.codeword_for(direction)
                .ok_or(ConsistencyError::MissingMirrorCodeword { sample: s.index })
        })
        .collect::<Result<Vec<Codeword>, _>>()?;

    // member masks must be read straight off the codewords
    for (sample, codeword) in codewords.iter().enumerate() {
        for pool in pools {
            let expected = codeword.bit(pool.index);
            let found = pool.member_mask[sample];
            if expected != found {
                return Err(ConsistencyError::MemberMaskMismatch {
                    direction,
                    pool: pool.index,
                    sample,
                    expected,
                    found,
                });
            }
        }
    }

    let mut sample_tallies = vec![Tally::default(); samples.len()];
    let mut pool_tallies = vec![Tally::default(); pools.len()];
    for (index, transfer) in plan.transfers.iter().enumerate() {
        if transfer.sample >= samples.len() {
            return Err(ConsistencyError::DanglingTransfer {
                index,
                side: "sample",
                found: transfer.sample,
                limit: samples.len(),
            });
        }
        if transfer.pool >= pools.len() {
            return Err(ConsistencyError::DanglingTransfer {
                index,
                side: "pool",
                found: transfer.pool,
                limit: pools.len(),
            });
        }
        for (side, tallies, i) in [
            ("sample", &mut sample_tallies, transfer.sample),
            ("pool", &mut pool_tallies, transfer.pool),
        ] {
            tallies[i] = tallies[i]
                .checked_add(transfer)
                .ok_or(ConsistencyError::TallyOverflow {
                    direction,
                    side,
                    index: i,
                })?;
        }
    }

    for (sample, (&codeword, tally)) in codewords.iter().zip(&sample_tallies).enumerate() {
        if tally.records != codeword.weight() {
            return Err(ConsistencyError::SampleTransferMismatch {
                direction,
                sample,
                codeword,
                expected: codeword.weight(),
                found: tally.records,
            });
        }
    }
    for (pool, tally) in pools.iter().zip(&pool_tallies) {
        if tally.records != pool.weight() {
            return Err(ConsistencyError::PoolTransferMismatch {
                direction,
                pool: pool.index,
                expected: pool.weight(),
                found: tally.records,
            });
        }
    }

    for (side, planned, found) in [
        ("sample", &plan.sample_tallies, &sample_tallies),
        ("pool", &plan.pool_tallies, &pool_tallies),
    ] {
        if planned.len() != found.len() {
            return Err(ConsistencyError::TallyLength {
                direction,
                side,
                planned: planned.len(),
                found: found.len(),
            });
        }
        for (index, (p, f)) in planned.iter().zip(found).enumerate() {
            if p.records != f.records || p.count != f.count || !volumes_match(p.volume, f.volume)
            {
                return Err(ConsistencyError::TallyMismatch {
                    direction,
                    side,
                    index,
                    planned_count: p.count,
                    planned_volume: p.volume,
                    found_count: f.count,
                    found_volume: f.volume,
                });
            }
        }
    }

    let from_samples = TransferStats::from_tallies(&sample_tallies);
    let into_pools = TransferStats::from_tallies(&pool_tallies);
    if from_samples.total_count != into_pools.total_count
        || !volumes_match(from_samples.total_volume, into_pools.total_volume)
    {
        return Err(ConsistencyError::MassBalance {
            direction,
            sample_count: from_samples.total_count,
            sample_volume: from_samples.total_volume,
            pool_count: into_pools.total_count,
            pool_volume: into_pools.total_volume,
        });
    }
    debug!(
        "{direction} plan checked: {} transfers, {} ul",
        from_samples.total_count, from_samples.total_volume
    );

    Ok(DirectionSummary {
        direction,
        sample_tallies,
        pool_tallies,
        from_samples,
        into_pools,
    })
}

/// Recount `plan` from its transfer records and codewords, and fail on any disagreement
/// with the planner's totals or with the codeword weights.
pub fn validate(plan: PoolingPlan) -> Result<ValidatedPlan, ConsistencyError> {
    let primary = check_direction(&plan.samples, &plan.pools, &plan.sample_transfers)?;

    let mirror = match (&plan.mirror_pools, &plan.mirror_transfers) {
        (Some(pools), Some(transfers)) => {
            for sample in &plan.samples {
                let mirror = sample
                    .mirror_codeword
                    .ok_or(ConsistencyError::MissingMirrorCodeword {
                        sample: sample.index,
                    })?;
                if mirror != sample.codeword.complement() {
                    return Err(ConsistencyError::MirrorNotComplement {
                        sample: sample.index,
                        codeword: sample.codeword,
                        mirror,
                    });
                }
            }
            Some(check_direction(&plan.samples, pools, transfers)?)
        }
        _ => None,
    };

    let summary = PlanSummary {
        num_samples: plan.samples.len(),
        num_pools: plan.pools.len(),
        num_mirror_pools: plan.mirror_pools.as_ref().map_or(0, Vec::len),
        primary,
        mirror,
    };
    Ok(ValidatedPlan { plan, summary })
}
