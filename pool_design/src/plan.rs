//! The compile pipeline: codewords, pools, transfers, validation.
use crate::codeword::{assign_codewords, CodewordSource};
use crate::errors::PoolingError;
use crate::plate::{check_disjoint_plates, mirror_plate_ids, plate_positions, WellPosition};
use crate::scheme::{derive_pools, make_samples, Direction, Pool, Sample};
use crate::transfer::{plan_transfers, TransferPlan, VolumePolicy};
use crate::validate::{validate, ValidatedPlan};
use log::info;
use serde::{Deserialize, Serialize};

/// Plate sizes and IDs for the sample (source) and pool (destination) plates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateLayout {
    pub sample_plate_size: usize,
    pub sample_plate_ids: Vec<String>,
    pub pool_plate_size: usize,
    pub pool_plate_ids: Vec<String>,
}

impl PlateLayout {
    /// One sample plate and one pool plate.
    pub fn single(
        sample_plate_id: &str,
        sample_plate_size: usize,
        pool_plate_id: &str,
        pool_plate_size: usize,
    ) -> Self {
        PlateLayout {
            sample_plate_size,
            sample_plate_ids: vec![sample_plate_id.to_string()],
            pool_plate_size,
            pool_plate_ids: vec![pool_plate_id.to_string()],
        }
    }
}

/// Everything needed to compile a pooling plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolingDesign {
    pub sample_positions: Vec<WellPosition>,
    pub pool_positions: Vec<WellPosition>,
    /// Set when the mirror design is wanted.
    pub mirror_pool_positions: Option<Vec<WellPosition>>,
    pub codeword_length: usize,
    pub codeword_source: CodewordSource,
    pub volume_policy: VolumePolicy,
}

impl PoolingDesign {
    /// Lay out `num_samples` samples and `num_pools` pools (one per codeword position) on
    /// the plates of `layout`. Mirror pools go on the pool plates with `_mirror` IDs.
    pub fn new(
        num_samples: usize,
        num_pools: usize,
        layout: &PlateLayout,
        codeword_source: CodewordSource,
        volume_policy: VolumePolicy,
        mirror: bool,
    ) -> Result<Self, PoolingError> {
        let sample_positions = plate_positions(
            num_samples,
            layout.sample_plate_size,
            &layout.sample_plate_ids,
        )?;
        let pool_positions =
            plate_positions(num_pools, layout.pool_plate_size, &layout.pool_plate_ids)?;
        let mirror_ids = if mirror {
            mirror_plate_ids(&layout.pool_plate_ids)
        } else {
            Vec::new()
        };
        check_disjoint_plates(&[
            ("sample", layout.sample_plate_ids.as_slice()),
            ("pool", layout.pool_plate_ids.as_slice()),
            ("mirror pool", mirror_ids.as_slice()),
        ])?;
        let mirror_pool_positions = if mirror {
            Some(plate_positions(
                num_pools,
                layout.pool_plate_size,
                &mirror_ids,
            )?)
        } else {
            None
        };
        Ok(PoolingDesign {
            sample_positions,
            pool_positions,
            mirror_pool_positions,
            codeword_length: num_pools,
            codeword_source,
            volume_policy,
        })
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror_pool_positions.is_some()
    }
}

/// Samples, pools and transfers for both directions. Built by [`PoolingPlan::build`] and
/// only handed out after [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoolingPlan {
    pub samples: Vec<Sample>,
    pub pools: Vec<Pool>,
    pub mirror_pools: Option<Vec<Pool>>,
    pub sample_transfers: TransferPlan,
    pub mirror_transfers: Option<TransferPlan>,
}

impl PoolingPlan {
    /// Run the assigner, deriver and planner. The result is not yet validated.
    pub fn build(design: &PoolingDesign) -> Result<Self, PoolingError> {
        let len = design.codeword_length;
        let codewords = assign_codewords(
            design.sample_positions.len(),
            len,
            &design.codeword_source,
        )?;
        let samples = make_samples(
            design.sample_positions.clone(),
            &codewords,
            design.has_mirror(),
        );

        let pools = derive_pools(&samples, len, Direction::Primary, &design.pool_positions)?;
        let sample_transfers = plan_transfers(
            &samples,
            &pools,
            Direction::Primary,
            &design.volume_policy,
        )?;

        let (mirror_pools, mirror_transfers) = match &design.mirror_pool_positions {
            Some(positions) => {
                let pools = derive_pools(&samples, len, Direction::Mirror, positions)?;
                let transfers =
                    plan_transfers(&samples, &pools, Direction::Mirror, &design.volume_policy)?;
                (Some(pools), Some(transfers))
            }
            None => (None, None),
        };

        Ok(PoolingPlan {
            samples,
            pools,
            mirror_pools,
            sample_transfers,
            mirror_transfers,
        })
    }

    /// Pools of `direction`, or None if the plan has no mirror design.
    pub fn pools_for(&self, direction: Direction) -> Option<&[Pool]> {
        match direction {
            Direction::Primary => Some(&self.pools),
            Direction::Mirror => self.mirror_pools.as_deref(),
        }
    }
}

/// Build and validate the plan for `design`.
pub fn compile(design: &PoolingDesign) -> Result<ValidatedPlan, PoolingError> {
    let plan = PoolingPlan::build(design)?;
    let validated = validate(plan)?;
    let summary = validated.summary();
    info!(
        "compiled {} samples into {} pools and {} mirror pools",
        summary.num_samples, summary.num_pools, summary.num_mirror_pools
    );
    Ok(validated)
}
