use crate::codeword::{Codeword, DistanceBounds};
use crate::scheme::Direction;

/// Failures while attaching codewords to samples.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error(
        "Cannot assign {num_samples} samples unique codewords of length {codeword_length}: \
         only {available} usable codewords are available (the all-zero codeword is reserved)."
    )]
    CodeSpaceExhausted {
        num_samples: usize,
        codeword_length: usize,
        available: u128,
    },

    #[error("Samples {first} and {second} were both assigned codeword {codeword}.")]
    DuplicateCodeword {
        first: usize,
        second: usize,
        codeword: Codeword,
    },

    #[error("Entries {first} and {second} of the code are both {codeword}.")]
    DuplicateInCode {
        first: usize,
        second: usize,
        codeword: Codeword,
    },

    #[error(
        "Codewords {first} ({a}) and {second} ({b}) are at Hamming distance {distance}, \
         outside the required range {bounds}."
    )]
    DistanceOutOfRange {
        first: usize,
        second: usize,
        a: Codeword,
        b: Codeword,
        distance: usize,
        bounds: DistanceBounds,
    },

    #[error("Line {line} of the code file: {reason}: '{text}'")]
    BadCodeword {
        line: usize,
        text: String,
        reason: String,
    },
}

/// A transfer plan whose recomputed totals disagree with the design. These indicate a logic
/// defect and are never tolerated.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    #[error(
        "{direction} sample {sample} has {found} outgoing transfers but its codeword {codeword} \
         has weight {expected}"
    )]
    SampleTransferMismatch {
        direction: Direction,
        sample: usize,
        codeword: Codeword,
        expected: usize,
        found: usize,
    },

    #[error(
        "{direction} pool {pool} has {found} incoming transfers but {expected} member samples"
    )]
    PoolTransferMismatch {
        direction: Direction,
        pool: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "{direction} pool {pool} membership of sample {sample} is {found} but the codeword bit is \
         {expected}"
    )]
    MemberMaskMismatch {
        direction: Direction,
        pool: usize,
        sample: usize,
        expected: bool,
        found: bool,
    },

    #[error(
        "{direction} {side} {index}: planner tallied {planned_count} transfers ({planned_volume} ul) \
         but the transfer list holds {found_count} ({found_volume} ul)"
    )]
    TallyMismatch {
        direction: Direction,
        side: &'static str,
        index: usize,
        planned_count: usize,
        planned_volume: f64,
        found_count: usize,
        found_volume: f64,
    },

    #[error("{direction} planner kept {planned} {side} tallies for {found} {side}s")]
    TallyLength {
        direction: Direction,
        side: &'static str,
        planned: usize,
        found: usize,
    },

    #[error("sample {sample}: mirror codeword {mirror} is not the complement of {codeword}")]
    MirrorNotComplement {
        sample: usize,
        codeword: Codeword,
        mirror: Codeword,
    },

    #[error("sample {sample} has no mirror codeword although mirror pools were planned")]
    MissingMirrorCodeword { sample: usize },

    #[error(
        "{direction} transfers do not balance: samples send {sample_count} transfers \
         ({sample_volume} ul), pools receive {pool_count} transfers ({pool_volume} ul)"
    )]
    MassBalance {
        direction: Direction,
        sample_count: usize,
        sample_volume: f64,
        pool_count: usize,
        pool_volume: f64,
    },

    #[error("{direction} {side} {index}: recounted transfers overflow")]
    TallyOverflow {
        direction: Direction,
        side: &'static str,
        index: usize,
    },

    #[error("transfer {index} references {side} {found}, but only {limit} exist")]
    DanglingTransfer {
        index: usize,
        side: &'static str,
        found: usize,
        limit: usize,
    },
}

/// Invalid design parameters or plate layout.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Codeword length must be between 1 and {max}, got {found}.")]
    CodewordLength { found: usize, max: usize },

    #[error("The {what} must be a positive number of ul, got {found}.")]
    NonPositiveVolume { what: &'static str, found: f64 },

    #[error("Plate size must be one of {allowed:?}, got {found}.")]
    UnknownPlateSize { found: usize, allowed: &'static [usize] },

    #[error("Can't get well {well} from a {size}-well plate!")]
    NoSuchWell { well: String, size: usize },

    #[error("The plate ID list is empty; at least one plate is needed for {num_items} items.")]
    NoPlates { num_items: usize },

    #[error("Can't fit {num_items} items in {num_plates} {plate_size}-well plates!")]
    NotEnoughPlates {
        num_items: usize,
        num_plates: usize,
        plate_size: usize,
    },

    #[error(
        "Why use {num_plates} {plate_size}-well plates when you can fit {num_items} items in {} \
         plates?",
        num_plates - 1
    )]
    TooManyPlates {
        num_items: usize,
        num_plates: usize,
        plate_size: usize,
    },

    #[error("Plate ID '{plate_id}' is used more than once.")]
    DuplicatePlateId { plate_id: String },

    #[error("Plate ID '{plate_id}' is used for both {first} and {second} plates.")]
    PlateIdConflict {
        plate_id: String,
        first: &'static str,
        second: &'static str,
    },

    #[error(
        "Moving {transfer_volume} ul at most {max_single_transfer} ul at a time takes more than \
         {limit} pipetting operations per transfer."
    )]
    TooManyOperations {
        transfer_volume: f64,
        max_single_transfer: f64,
        limit: usize,
    },

    #[error("{direction} {side} {index} needs more transfers than can be counted.")]
    TallyOverflow {
        direction: Direction,
        side: &'static str,
        index: usize,
    },

    #[error("{direction} design has {num_pools} pools but only {num_positions} destination wells.")]
    TooFewDestinations {
        direction: Direction,
        num_pools: usize,
        num_positions: usize,
    },
}

/// Any failure while compiling a pooling plan.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PoolingError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
