//! Command files for the liquid-handling robot.
use anyhow::{Context, Result};
use pool_design::{Direction, TransferPlan, ValidatedPlan};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A command file format that a liquid-handling robot can execute.
pub trait CommandFormat {
    /// Write every physical pipetting operation of `transfers`, in plan order.
    fn write_transfers(&self, out: &mut dyn Write, transfers: &TransferPlan) -> Result<()>;
}

#[derive(Serialize)]
struct BiomekRow<'a> {
    #[serde(rename = "SourcePlt")]
    source_plate: &'a str,
    #[serde(rename = "SourceWell")]
    source_well: &'a str,
    #[serde(rename = "DestPlt")]
    dest_plate: &'a str,
    #[serde(rename = "DestWell")]
    dest_well: &'a str,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Biomek transfer list: `SourcePlt,SourceWell,DestPlt,DestWell,Volume`, one row per
/// pipetting operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiomekCsv;

impl CommandFormat for BiomekCsv {
    fn write_transfers(&self, out: &mut dyn Write, transfers: &TransferPlan) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        // the header comes from the first row, so an empty plan still needs one
        if transfers.transfers.is_empty() {
            writer.write_record(["SourcePlt", "SourceWell", "DestPlt", "DestWell", "Volume"])?;
        }
        for transfer in &transfers.transfers {
            let row = BiomekRow {
                source_plate: &transfer.source.plate_id,
                source_well: &transfer.source.well,
                dest_plate: &transfer.destination.plate_id,
                dest_well: &transfer.destination.well,
                volume: transfer.volume_per_operation(),
            };
            for _ in 0..transfer.count {
                writer.serialize(&row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Write the transfers of `direction` to `path`. Does nothing if the plan has no such
/// direction.
pub fn write_command_file(
    format: &impl CommandFormat,
    validated: &ValidatedPlan,
    direction: Direction,
    path: &Path,
) -> Result<()> {
    let Some(transfers) = validated.transfers(direction) else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| path.display().to_string())?;
    let mut out = BufWriter::new(file);
    format
        .write_transfers(&mut out, transfers)
        .with_context(|| format!("writing {direction} transfers to {}", path.display()))?;
    out.flush()?;
    Ok(())
}
