//! Plate types and well positions.
use crate::errors::ConfigurationError;
use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported plate sizes with their (rows, columns).
const PLATE_ROWS_COLUMNS: &[(usize, (usize, usize))] =
    &[(6, (2, 3)), (24, (4, 6)), (96, (8, 12)), (384, (16, 24))];

/// Supported plate sizes, ascending.
pub const PLATE_SIZES: &[usize] = &[6, 24, 96, 384];

/// Suffix appended to destination plate IDs for the mirror design.
pub const MIRROR_SUFFIX: &str = "_mirror";

/// A well on a named plate, written `plate,well`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellPosition {
    pub plate_id: String,
    pub well: String,
}

impl fmt::Display for WellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.plate_id, self.well)
    }
}

/// A multiwell plate layout. Wells are numbered from 0 in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateType {
    size: usize,
    rows: usize,
    columns: usize,
}

impl PlateType {
    pub fn new(size: usize) -> Result<Self, ConfigurationError> {
        let Some(&(_, (rows, columns))) = PLATE_ROWS_COLUMNS.iter().find(|(s, _)| *s == size)
        else {
            return Err(ConfigurationError::UnknownPlateSize {
                found: size,
                allowed: PLATE_SIZES,
            });
        };
        assert_eq!(rows * columns, size);
        Ok(PlateType {
            size,
            rows,
            columns,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Well ID for a 0-based well number: 4 is B2 on a 6-well plate and A5 on a 96-well plate.
    pub fn well_id(&self, number: usize) -> Result<String, ConfigurationError> {
        if number >= self.size {
            return Err(ConfigurationError::NoSuchWell {
                well: number.to_string(),
                size: self.size,
            });
        }
        let row = (b'A' + (number / self.columns) as u8) as char;
        Ok(format!("{row}{}", number % self.columns + 1))
    }

    /// 0-based well number for a well ID such as `B1`.
    pub fn well_number(&self, id: &str) -> Result<usize, ConfigurationError> {
        let no_such_well = || ConfigurationError::NoSuchWell {
            well: id.to_string(),
            size: self.size,
        };
        let mut chars = id.chars();
        let row = chars.next().ok_or_else(no_such_well)?;
        if !row.is_ascii_uppercase() {
            return Err(no_such_well());
        }
        let row = (row as u8 - b'A') as usize;
        let column_text = chars.as_str();
        // reject "A01" and "A+1"
        if column_text.starts_with('0') || !column_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(no_such_well());
        }
        let column: usize = column_text.parse().map_err(|_| no_such_well())?;
        if row >= self.rows || column == 0 || column > self.columns {
            return Err(no_such_well());
        }
        Ok(row * self.columns + column - 1)
    }
}

/// Positions for `num_items` items filling the plates `plate_ids` in order, each plate
/// well by well. All plates must be needed: the last one holds at least one item.
pub fn plate_positions(
    num_items: usize,
    plate_size: usize,
    plate_ids: &[String],
) -> Result<Vec<WellPosition>, ConfigurationError> {
    let plate_type = PlateType::new(plate_size)?;
    let num_plates = plate_ids.len();
    if num_plates == 0 {
        return Err(ConfigurationError::NoPlates { num_items });
    }
    if num_items > plate_size * num_plates {
        return Err(ConfigurationError::NotEnoughPlates {
            num_items,
            num_plates,
            plate_size,
        });
    }
    if num_plates > 1 && num_items <= plate_size * (num_plates - 1) {
        return Err(ConfigurationError::TooManyPlates {
            num_items,
            num_plates,
            plate_size,
        });
    }
    let mut seen = FxHashSet::default();
    for id in plate_ids {
        if !seen.insert(id.as_str()) {
            return Err(ConfigurationError::DuplicatePlateId {
                plate_id: id.clone(),
            });
        }
    }

    (0..num_items)
        .map(|i| {
            Ok(WellPosition {
                plate_id: plate_ids[i / plate_size].clone(),
                well: plate_type.well_id(i % plate_size)?,
            })
        })
        .collect()
}

/// Fail if a plate ID appears in more than one of the named plate sets.
pub fn check_disjoint_plates(
    sets: &[(&'static str, &[String])],
) -> Result<(), ConfigurationError> {
    let mut owner = FxHashMap::default();
    for &(name, ids) in sets {
        for id in ids {
            match owner.get(id.as_str()) {
                Some(&first) if first != name => {
                    return Err(ConfigurationError::PlateIdConflict {
                        plate_id: id.clone(),
                        first,
                        second: name,
                    });
                }
                Some(_) => {}
                None => {
                    owner.insert(id.as_str(), name);
                }
            }
        }
    }
    Ok(())
}

/// Plate IDs for the mirror design: every ID gets [`MIRROR_SUFFIX`].
pub fn mirror_plate_ids(plate_ids: &[String]) -> Vec<String> {
    plate_ids
        .iter()
        .map(|id| format!("{id}{MIRROR_SUFFIX}"))
        .collect()
}
