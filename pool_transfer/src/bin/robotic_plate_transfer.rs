use anyhow::Result;
use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use parameters_toml::load_parameters;
use pool_transfer::options::TransferArgs;
use pool_transfer::run_info::RunContext;
use pool_transfer::{print_error_chain, write_outputs};
use std::io::Write;
use std::process::ExitCode;

fn setup_logging(args: &TransferArgs) {
    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

fn inner_main() -> Result<()> {
    let args = TransferArgs::parse();
    setup_logging(&args);

    let params = load_parameters(args.parameters.as_deref())?;
    let options = args.resolve(&params)?;
    let run = RunContext::capture(&options)?;
    let paths = options.output_paths();

    let validated = write_outputs(&options, &run)?;

    for line in validated.summary().lines() {
        info!("{line}");
    }
    info!("wrote {}", paths.report.display());
    Ok(())
}

fn main() -> ExitCode {
    match inner_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error_chain(&err);
            ExitCode::FAILURE
        }
    }
}
