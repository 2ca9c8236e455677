//! pool_design
//!
//! Compiles a combinatorial pooling design into a checked list of liquid transfers.
//! Each sample gets a binary codeword with one position per pool; a sample goes into
//! every pool where its codeword has a 1. The optional mirror design pools the
//! complemented codewords onto a second set of destination plates.

pub mod codeword;
pub mod errors;
pub mod plan;
pub mod plate;
pub mod scheme;
pub mod transfer;
pub mod validate;

pub use codeword::{Codeword, CodewordSource, DistanceBounds};
pub use errors::{AssignmentError, ConfigurationError, ConsistencyError, PoolingError};
pub use plan::{compile, PlateLayout, PoolingDesign, PoolingPlan};
pub use plate::{PlateType, WellPosition};
pub use scheme::{Direction, Pool, Sample};
pub use transfer::{Tally, Transfer, TransferPlan, VolumePolicy};
pub use validate::{PlanSummary, TransferStats, ValidatedPlan};
