use super::print_report;
use crate::cli::PdfArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use calcopp::{engine::progress::ProgressReporter, workflows};
use tracing::info;

pub fn run(args: PdfArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_pdf_args(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Converting 2D PDF section at {} K...", config.temperature);
    let report = workflows::pdf2d::run(
        &args.input,
        args.error.as_deref(),
        &args.output,
        &config,
        &reporter,
    )?;
    print_report(&report);
    Ok(())
}
