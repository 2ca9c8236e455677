//! The robotic_plate_transfer front end: options, run metadata and the two emitters.
pub mod options;
pub mod report;
pub mod robot;
pub mod run_info;

use anyhow::{Context, Result};
use itertools::Itertools;
use options::ResolvedOptions;
use pool_design::{compile, Direction, ValidatedPlan};
use report::write_report;
use robot::{write_command_file, BiomekCsv};
use run_info::RunContext;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Print an error and its causes to stderr.
pub fn print_error_chain(err: &anyhow::Error) {
    let error_chain = err.chain().join("\n\tCaused by: ");
    eprintln!("ERROR: {error_chain}");
}

/// Compile the design of `options` and write the Biomek file(s) and then the report.
pub fn write_outputs(options: &ResolvedOptions, run: &RunContext) -> Result<ValidatedPlan> {
    let paths = options.output_paths();
    let validated = compile(&options.design()?)?;

    write_command_file(&BiomekCsv, &validated, Direction::Primary, &paths.robot)?;
    if let Some(mirror_robot) = &paths.mirror_robot {
        write_command_file(&BiomekCsv, &validated, Direction::Mirror, mirror_robot)?;
    }

    let file = File::create(&paths.report).with_context(|| paths.report.display().to_string())?;
    let mut out = BufWriter::new(file);
    write_report(&mut out, &validated, run, &paths.robot_file_names())
        .with_context(|| format!("writing report {}", paths.report.display()))?;
    out.flush()?;
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use options::TransferArgs;
    use parameters_toml::Parameters;
    use std::path::PathBuf;

    fn run_context() -> RunContext {
        RunContext {
            command_line: "robotic_plate_transfer".to_string(),
            working_dir: PathBuf::from("/tmp"),
            date: "2011-07-01 12:00:00".to_string(),
            user: "lab".to_string(),
            host: "bench1".to_string(),
            options: "{}".to_string(),
        }
    }

    #[test]
    fn test_write_outputs_with_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("pools7");
        let args = TransferArgs::try_parse_from([
            "robotic_plate_transfer",
            "-n",
            "7",
            "-N",
            "3",
            "-m",
            base.to_str().unwrap(),
        ])
        .unwrap();
        let options = args.resolve(&Parameters::default()).unwrap();
        write_outputs(&options, &run_context()).unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        let report = read("pools7.txt");
        assert!(report.contains(
            "# Corresponding Biomek command file(s): pools7_Biomek.csv, pools7_Biomek_mirror.csv\n"
        ));
        assert!(report.ends_with(
            "transfers into mirror pools: 3-3 per pool (60-60 ul), total 9 transfers\n"
        ));

        let primary = read("pools7_Biomek.csv");
        assert_eq!(primary.lines().count(), 1 + 12);
        assert!(primary.starts_with(
            "SourcePlt,SourceWell,DestPlt,DestWell,Volume\nSource,A1,Destination,A3,20.0\n"
        ));
        let mirror = read("pools7_Biomek_mirror.csv");
        assert_eq!(mirror.lines().count(), 1 + 9);
        assert!(mirror
            .lines()
            .skip(1)
            .all(|l| l.contains(",Destination_mirror,")));
    }

    #[test]
    fn test_write_outputs_stops_on_bad_design() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("too_many");
        let args = TransferArgs::try_parse_from([
            "robotic_plate_transfer",
            "-n",
            "8",
            "-N",
            "3",
            base.to_str().unwrap(),
        ])
        .unwrap();
        let options = args.resolve(&Parameters::default()).unwrap();
        assert!(write_outputs(&options, &run_context()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
