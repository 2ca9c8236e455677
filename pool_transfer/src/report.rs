//! The human-readable transfer report.
use crate::run_info::RunContext;
use anyhow::Result;
use itertools::Itertools;
use pool_design::transfer::format_volume;
use pool_design::{Codeword, Direction, Pool, Tally, ValidatedPlan, WellPosition};
use std::io::Write;

/// Trailing columns of every table; the code column name goes in front of them.
const TALLY_COLUMNS: [&str; 2] = ["transfers", "volume (ul)"];

fn write_row(
    out: &mut impl Write,
    number: usize,
    position: &WellPosition,
    code: &str,
    tally: &Tally,
) -> Result<()> {
    writeln!(
        out,
        "{number}\t{position}\t{code}\t{}\t{}",
        tally.count,
        format_volume(tally.volume)
    )?;
    Ok(())
}

fn write_header(out: &mut impl Write, number: &str, code: &str) -> Result<()> {
    let columns = [number, "plate_and_well_position", code]
        .into_iter()
        .chain(TALLY_COLUMNS);
    writeln!(out, "{}", columns.format("\t"))?;
    Ok(())
}

fn write_sample_table(
    out: &mut impl Write,
    validated: &ValidatedPlan,
    direction: Direction,
    tallies: &[Tally],
) -> Result<()> {
    let code_column = match direction {
        Direction::Primary => "codeword",
        Direction::Mirror => "mirror_codeword",
    };
    writeln!(out)?;
    write_header(out, "sample_number", code_column)?;
    for (sample, tally) in validated.plan().samples.iter().zip(tallies) {
        let code = sample
            .codeword_for(direction)
            .as_ref()
            .map_or_else(String::new, Codeword::to_string);
        write_row(out, sample.index, &sample.source, &code, tally)?;
    }
    Ok(())
}

fn write_pool_table(
    out: &mut impl Write,
    pools: &[Pool],
    direction: Direction,
    tallies: &[Tally],
) -> Result<()> {
    let first = match direction {
        Direction::Primary => "pool_number",
        Direction::Mirror => "mirror_pool_number",
    };
    writeln!(out)?;
    write_header(out, first, "pooling_scheme")?;
    for (pool, tally) in pools.iter().zip(tallies) {
        write_row(out, pool.index, &pool.destination, &pool.scheme(), tally)?;
    }
    Ok(())
}

/// Write the report for `validated` to `out`: the run header, the sample and pool tables
/// (mirror tables after their primary counterparts), the robot file names and the
/// summary footer.
pub fn write_report(
    out: &mut impl Write,
    validated: &ValidatedPlan,
    run: &RunContext,
    robot_files: &[String],
) -> Result<()> {
    for line in run.header_lines() {
        writeln!(out, "# {line}")?;
    }

    let summary = validated.summary();
    let plan = validated.plan();
    write_sample_table(
        out,
        validated,
        Direction::Primary,
        &summary.primary.sample_tallies,
    )?;
    if let Some(mirror) = &summary.mirror {
        write_sample_table(out, validated, Direction::Mirror, &mirror.sample_tallies)?;
    }

    write_pool_table(
        out,
        &plan.pools,
        Direction::Primary,
        &summary.primary.pool_tallies,
    )?;
    if let (Some(mirror), Some(pools)) = (&summary.mirror, &plan.mirror_pools) {
        write_pool_table(out, pools, Direction::Mirror, &mirror.pool_tallies)?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "# Corresponding Biomek command file(s): {}",
        robot_files.join(", ")
    )?;
    for line in summary.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_design::{compile, CodewordSource, PlateLayout, PoolingDesign, VolumePolicy};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn run_context() -> RunContext {
        RunContext {
            command_line: "robotic_plate_transfer -n 7 -N 3 -m out".to_string(),
            working_dir: PathBuf::from("/data/pools"),
            date: "2011-07-01 12:00:00".to_string(),
            user: "lab".to_string(),
            host: "bench1".to_string(),
            options: r#"{"number_of_samples":7}"#.to_string(),
        }
    }

    fn report(mirror: bool) -> String {
        report_with(VolumePolicy::default(), mirror)
    }

    fn report_with(policy: VolumePolicy, mirror: bool) -> String {
        let design = PoolingDesign::new(
            7,
            3,
            &PlateLayout::single("Source", 96, "Destination", 96),
            CodewordSource::Sequential,
            policy,
            mirror,
        )
        .unwrap();
        let validated = compile(&design).unwrap();
        let mut robot_files = vec!["out_Biomek.csv".to_string()];
        if mirror {
            robot_files.push("out_Biomek_mirror.csv".to_string());
        }
        let mut out = Vec::new();
        write_report(&mut out, &validated, &run_context(), &robot_files).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_without_mirror() {
        let expected = "\
# Command line this file was generated with: robotic_plate_transfer -n 7 -N 3 -m out
# Path: /data/pools
# Date: 2011-07-01 12:00:00, user lab, host bench1
# Full options: {\"number_of_samples\":7}

sample_number\tplate_and_well_position\tcodeword\ttransfers\tvolume (ul)
0\tSource,A1\t001\t1\t20
1\tSource,A2\t010\t1\t20
2\tSource,A3\t011\t2\t40
3\tSource,A4\t100\t1\t20
4\tSource,A5\t101\t2\t40
5\tSource,A6\t110\t2\t40
6\tSource,A7\t111\t3\t60

pool_number\tplate_and_well_position\tpooling_scheme\ttransfers\tvolume (ul)
0\tDestination,A1\t0001111\t4\t80
1\tDestination,A2\t0110011\t4\t80
2\tDestination,A3\t1010101\t4\t80

# Corresponding Biomek command file(s): out_Biomek.csv
Total 7 samples into 3 pools (and 0 mirror pools)
transfers from samples: 1-3 per sample (20-60 ul), total 12 transfers
transfers into pools: 4-4 per pool (80-80 ul), total 12 transfers
";
        assert_eq!(report(false), expected);
    }

    #[test]
    fn test_report_with_mirror() {
        let text = report(true);
        let expected_tail = "\
sample_number\tplate_and_well_position\tmirror_codeword\ttransfers\tvolume (ul)
0\tSource,A1\t110\t2\t40
1\tSource,A2\t101\t2\t40
2\tSource,A3\t100\t1\t20
3\tSource,A4\t011\t2\t40
4\tSource,A5\t010\t1\t20
5\tSource,A6\t001\t1\t20
6\tSource,A7\t000\t0\t0

pool_number\tplate_and_well_position\tpooling_scheme\ttransfers\tvolume (ul)
0\tDestination,A1\t0001111\t4\t80
1\tDestination,A2\t0110011\t4\t80
2\tDestination,A3\t1010101\t4\t80

mirror_pool_number\tplate_and_well_position\tpooling_scheme\ttransfers\tvolume (ul)
0\tDestination_mirror,A1\t1110000\t3\t60
1\tDestination_mirror,A2\t1001100\t3\t60
2\tDestination_mirror,A3\t0101010\t3\t60

# Corresponding Biomek command file(s): out_Biomek.csv, out_Biomek_mirror.csv
Total 7 samples into 3 pools (and 3 mirror pools)
transfers from samples: 1-3 per sample (20-60 ul), total 12 transfers
mirror transfers from samples: 0-2 per sample (0-40 ul), total 9 transfers
transfers into pools: 4-4 per pool (80-80 ul), total 12 transfers
transfers into mirror pools: 3-3 per pool (60-60 ul), total 9 transfers
";
        assert!(text.ends_with(expected_tail), "{text}");
        // primary sample table comes first
        let primary = text.find("\tcodeword\t").unwrap();
        let mirror = text.find("\tmirror_codeword\t").unwrap();
        assert!(primary < mirror);
    }

    #[test]
    fn test_report_fractional_volumes() {
        let text = report_with(VolumePolicy::new(2.2, None).unwrap(), false);
        let body: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(
            body,
            vec![
                "",
                "sample_number\tplate_and_well_position\tcodeword\ttransfers\tvolume (ul)",
                "0\tSource,A1\t001\t1\t2.2",
                "1\tSource,A2\t010\t1\t2.2",
                "2\tSource,A3\t011\t2\t4.4",
                "3\tSource,A4\t100\t1\t2.2",
                "4\tSource,A5\t101\t2\t4.4",
                "5\tSource,A6\t110\t2\t4.4",
                "6\tSource,A7\t111\t3\t6.6",
                "",
                "pool_number\tplate_and_well_position\tpooling_scheme\ttransfers\tvolume (ul)",
                "0\tDestination,A1\t0001111\t4\t8.8",
                "1\tDestination,A2\t0110011\t4\t8.8",
                "2\tDestination,A3\t1010101\t4\t8.8",
                "",
                "# Corresponding Biomek command file(s): out_Biomek.csv",
                "Total 7 samples into 3 pools (and 0 mirror pools)",
                "transfers from samples: 1-3 per sample (2.2-6.6 ul), total 12 transfers",
                "transfers into pools: 4-4 per pool (8.8-8.8 ul), total 12 transfers",
            ]
        );
    }

    #[test]
    fn test_report_is_reproducible() {
        assert_eq!(report(true), report(true));
    }
}
