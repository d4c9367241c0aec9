use super::print_report;
use crate::cli::DensityArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use calcopp::{engine::progress::ProgressReporter, workflows};
use tracing::info;

pub fn run(args: DensityArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_density_args(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Converting scatterer density at {} K (reference: {})...",
        config.temperature, config.extremum
    );
    let report = workflows::density::run(&args.input, &args.output, &config, &reporter)?;
    print_report(&report);
    Ok(())
}
