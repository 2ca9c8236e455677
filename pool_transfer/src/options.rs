//! Command line options, and their resolution against the parameters file.
use anyhow::{Context, Result};
use clap::Parser;
use parameters_toml::Parameters;
use pool_design::codeword::{check_distances, read_code_file};
use pool_design::{CodewordSource, DistanceBounds, PlateLayout, PoolingDesign, VolumePolicy};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Suffix of the Biomek command file written next to the report.
pub const BIOMEK_SUFFIX: &str = "_Biomek";

/// Compile a combinatorial pooling design into Biomek transfer files and a
/// human-readable transfer report.
///
/// Every sample gets a unique binary codeword with one position per pool, and is
/// transferred into each pool where its codeword has a 1. With --add_mirror_pooling,
/// the complemented codewords are pooled onto a second set of plates.
#[derive(Parser, Debug, Clone)]
#[clap(name = "robotic_plate_transfer")]
pub struct TransferArgs {
    /// Base path for the outputs: <outfile_base>.txt, <outfile_base>_Biomek.csv and,
    /// with mirroring, <outfile_base>_Biomek_mirror.csv.
    pub outfile_base: PathBuf,

    /// Number of samples to pool.
    #[clap(short = 'n', long = "number_of_samples")]
    pub number_of_samples: usize,

    /// Number of pools, which is also the codeword length.
    #[clap(short = 'N', long = "number_of_pools")]
    pub number_of_pools: usize,

    /// File with one codeword per line ('#' lines are comments). Without it, sample i
    /// gets the binary representation of i+1.
    #[clap(short = 'c', long = "codeword_file")]
    pub codeword_file: Option<PathBuf>,

    /// Reject the code file if two of its codewords are closer than this Hamming distance.
    #[clap(long = "min_hamming_distance", requires = "codeword_file")]
    pub min_hamming_distance: Option<usize>,

    /// Reject the code file if two of its codewords are further apart than this.
    #[clap(long = "max_hamming_distance", requires = "codeword_file")]
    pub max_hamming_distance: Option<usize>,

    /// Wells per sample plate (6, 24, 96 or 384).
    #[clap(short = 's', long = "size_of_sample_plates")]
    pub size_of_sample_plates: Option<usize>,

    /// Wells per pool plate (6, 24, 96 or 384).
    #[clap(short = 'S', long = "size_of_pool_plates")]
    pub size_of_pool_plates: Option<usize>,

    /// Comma-separated sample plate IDs, in fill order.
    #[clap(short = 'i', long = "sample_plate_IDs", value_delimiter = ',')]
    pub sample_plate_ids: Vec<String>,

    /// Comma-separated pool plate IDs, in fill order.
    #[clap(short = 'o', long = "pool_plate_IDs", value_delimiter = ',')]
    pub pool_plate_ids: Vec<String>,

    /// Volume (ul) moved from a sample into each of its pools.
    #[clap(short = 'v', long = "volume_per_transfer")]
    pub volume_per_transfer: Option<f64>,

    /// Largest volume (ul) the robot moves in one operation; larger transfers are split.
    #[clap(long = "max_volume_per_transfer")]
    pub max_volume_per_transfer: Option<f64>,

    /// Also pool the complemented codewords onto "<pool plate ID>_mirror" plates.
    #[clap(short = 'm', long = "add_mirror_pooling")]
    pub add_mirror_pooling: bool,

    /// TOML file with default settings. Defaults to parameters.toml next to the executable.
    #[clap(long)]
    pub parameters: Option<PathBuf>,

    /// Only log warnings and errors.
    #[clap(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debugging detail.
    #[clap(long)]
    pub verbose: bool,
}

/// The settings a run actually uses, after command line overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub outfile_base: PathBuf,
    pub number_of_samples: usize,
    pub number_of_pools: usize,
    pub codeword_file: Option<PathBuf>,
    pub distance_bounds: DistanceBounds,
    pub layout: PlateLayout,
    pub volume_policy: VolumePolicy,
    pub add_mirror_pooling: bool,
}

/// Output file locations derived from the outfile base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub robot: PathBuf,
    pub mirror_robot: Option<PathBuf>,
}

impl OutputPaths {
    /// File names of the robot command files, as referenced from the report.
    pub fn robot_file_names(&self) -> Vec<String> {
        std::iter::once(&self.robot)
            .chain(&self.mirror_robot)
            .map(|p| {
                p.file_name()
                    .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned())
            })
            .collect()
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl TransferArgs {
    /// Fill in whatever the command line left unset from `params`.
    pub fn resolve(&self, params: &Parameters) -> Result<ResolvedOptions> {
        let pick_ids = |ids: &Vec<String>, default: &Vec<String>| {
            if ids.is_empty() {
                default.clone()
            } else {
                ids.clone()
            }
        };
        let layout = PlateLayout {
            sample_plate_size: self
                .size_of_sample_plates
                .unwrap_or(params.sample_plate_size),
            sample_plate_ids: pick_ids(&self.sample_plate_ids, &params.sample_plate_ids),
            pool_plate_size: self.size_of_pool_plates.unwrap_or(params.pool_plate_size),
            pool_plate_ids: pick_ids(&self.pool_plate_ids, &params.pool_plate_ids),
        };
        let volume_policy = VolumePolicy::new(
            self.volume_per_transfer
                .unwrap_or(params.volume_per_transfer),
            self.max_volume_per_transfer
                .or(params.max_volume_per_transfer),
        )?;
        Ok(ResolvedOptions {
            outfile_base: self.outfile_base.clone(),
            number_of_samples: self.number_of_samples,
            number_of_pools: self.number_of_pools,
            codeword_file: self.codeword_file.clone(),
            distance_bounds: DistanceBounds {
                min: self.min_hamming_distance,
                max: self.max_hamming_distance,
            },
            layout,
            volume_policy,
            add_mirror_pooling: self.add_mirror_pooling,
        })
    }
}

impl ResolvedOptions {
    pub fn output_paths(&self) -> OutputPaths {
        let robot = with_suffix(&self.outfile_base, &format!("{BIOMEK_SUFFIX}.csv"));
        let mirror_robot = self.add_mirror_pooling.then(|| {
            with_suffix(
                &self.outfile_base,
                &format!("{BIOMEK_SUFFIX}{}.csv", pool_design::plate::MIRROR_SUFFIX),
            )
        });
        OutputPaths {
            report: with_suffix(&self.outfile_base, ".txt"),
            robot,
            mirror_robot,
        }
    }

    /// Read the code file, if any, and lay out the design.
    pub fn design(&self) -> Result<PoolingDesign> {
        let codeword_source = match &self.codeword_file {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening code file {}", path.display()))?;
                let codes = read_code_file(BufReader::new(file), self.number_of_pools)
                    .with_context(|| format!("reading code file {}", path.display()))?;
                check_distances(&codes, self.distance_bounds)
                    .with_context(|| format!("checking code file {}", path.display()))?;
                CodewordSource::Listed(codes)
            }
            None => CodewordSource::Sequential,
        };
        Ok(PoolingDesign::new(
            self.number_of_samples,
            self.number_of_pools,
            &self.layout,
            codeword_source,
            self.volume_policy,
            self.add_mirror_pooling,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_design::AssignmentError;
    use std::io::Write;

    fn parse(args: &[&str]) -> TransferArgs {
        let argv = std::iter::once("robotic_plate_transfer").chain(args.iter().copied());
        TransferArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_from_parameters() {
        let args = parse(&["-n", "7", "-N", "3", "out/run1"]);
        let opts = args.resolve(&Parameters::default()).unwrap();
        assert_eq!(opts.layout, PlateLayout::single("Source", 96, "Destination", 96));
        assert_eq!(opts.volume_policy, VolumePolicy::default());
        assert!(!opts.add_mirror_pooling);
        let paths = opts.output_paths();
        assert_eq!(paths.report, PathBuf::from("out/run1.txt"));
        assert_eq!(paths.robot, PathBuf::from("out/run1_Biomek.csv"));
        assert_eq!(paths.mirror_robot, None);
        assert_eq!(paths.robot_file_names(), vec!["run1_Biomek.csv"]);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--number_of_samples",
            "20",
            "--number_of_pools",
            "5",
            "-s",
            "6",
            "-i",
            "p1,p2,p3,p4",
            "-o",
            "pools",
            "-v",
            "40",
            "--max_volume_per_transfer",
            "20",
            "-m",
            "run2",
        ]);
        let opts = args.resolve(&Parameters::default()).unwrap();
        assert_eq!(opts.layout.sample_plate_size, 6);
        assert_eq!(opts.layout.sample_plate_ids, vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(opts.layout.pool_plate_ids, vec!["pools"]);
        assert_eq!(opts.volume_policy.operations_per_contribution(), 2);
        assert_eq!(
            opts.output_paths().robot_file_names(),
            vec!["run2_Biomek.csv", "run2_Biomek_mirror.csv"]
        );
        let design = opts.design().unwrap();
        assert_eq!(design.sample_positions[19].to_string(), "p4,A2");
        assert_eq!(
            design.mirror_pool_positions.unwrap()[4].to_string(),
            "pools_mirror,A5"
        );
    }

    #[test]
    fn test_bad_volume() {
        let args = parse(&["-n", "7", "-N", "3", "-v", "0", "out"]);
        assert!(args.resolve(&Parameters::default()).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(TransferArgs::try_parse_from([
            "robotic_plate_transfer",
            "-n",
            "7",
            "-N",
            "3",
            "-q",
            "--verbose",
            "out",
        ])
        .is_err());
    }

    #[test]
    fn test_code_file_design() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# weight-2 code\n0011\n0101\n0110\n1001").unwrap();
        let code_path = file.path().to_str().unwrap().to_string();
        let args = parse(&["-n", "3", "-N", "4", "-c", &code_path, "out"]);
        let design = args.resolve(&Parameters::default()).unwrap().design().unwrap();
        assert_eq!(
            design.codeword_source,
            CodewordSource::Listed(
                ["0011", "0101", "0110", "1001"]
                    .iter()
                    .map(|s| s.parse().unwrap())
                    .collect()
            )
        );

        let args = parse(&["-n", "3", "-N", "3", "-c", &code_path, "out"]);
        assert!(args.resolve(&Parameters::default()).unwrap().design().is_err());
    }

    #[test]
    fn test_code_file_distance_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // pairwise distances 2, 2 and 4
        writeln!(file, "0011\n0101\n1010").unwrap();
        let code_path = file.path().to_str().unwrap().to_string();
        let design = |extra: &[&str]| {
            let mut argv: Vec<&str> = vec!["-n", "3", "-N", "4", "-c", code_path.as_str()];
            argv.extend_from_slice(extra);
            argv.push("out");
            parse(&argv).resolve(&Parameters::default()).unwrap().design()
        };
        assert!(design(&["--min_hamming_distance", "2"]).is_ok());
        assert!(design(&["--max_hamming_distance", "4"]).is_ok());
        let err = design(&["--min_hamming_distance", "3"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssignmentError>(),
            Some(AssignmentError::DistanceOutOfRange { distance: 2, .. })
        ));
        assert!(design(&["--max_hamming_distance", "3"]).is_err());

        // the bounds only apply to code files
        assert!(TransferArgs::try_parse_from([
            "robotic_plate_transfer",
            "-n",
            "3",
            "-N",
            "4",
            "--min_hamming_distance",
            "2",
            "out",
        ])
        .is_err());
    }
}
