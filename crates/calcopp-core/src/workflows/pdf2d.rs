use super::{RunReport, file_name};
use crate::core::io::output::OutputBatch;
use crate::core::io::stf::StfFile;
use crate::core::io::table::{TableColumn, TableWriter};
use crate::core::io::traits::GridFile;
use crate::core::models::grid::GridDataset;
use crate::core::models::layers::{LayerSelection, OutputLayer};
use crate::engine::config::{TransformConfig, UncertaintyMode};
use crate::engine::consistency::usable_layers;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter, TaskTicker};
use crate::engine::transform::{Normalization, PotentialTransform};
use std::io;
use std::path::Path;
use tracing::{info, instrument, warn};

fn table_columns(layers: &LayerSelection, mode: UncertaintyMode) -> Vec<TableColumn> {
    let mut columns = vec![TableColumn::new("x", "Å"), TableColumn::new("y", "Å")];
    for layer in layers.iter() {
        match layer {
            OutputLayer::Pdf => columns.push(TableColumn::new("PDF", "Å^-2")),
            OutputLayer::PdfUncertainty => {
                columns.push(TableColumn::new("PDF uncertainty", "Å^-2"))
            }
            OutputLayer::Opp => columns.push(TableColumn::new("OPP", "eV")),
            OutputLayer::OppUncertainty => match mode {
                UncertaintyMode::Symmetric => {
                    columns.push(TableColumn::new("OPP uncertainty", "eV"))
                }
                UncertaintyMode::Asymmetric => {
                    columns.push(TableColumn::new("OPP uncertainty +", "eV"));
                    columns.push(TableColumn::new("OPP uncertainty -", "eV"));
                }
            },
        }
    }
    columns
}

fn header_comments(
    input: &Path,
    error: Option<&Path>,
    transform: &PotentialTransform,
    layers: &LayerSelection,
    pdf: &GridDataset,
) -> Vec<String> {
    let mut comments = vec![
        format!(
            "CalcOPP {}: one-particle potential from a 2D PDF section",
            env!("CARGO_PKG_VERSION")
        ),
        format!("PDF: {}", file_name(input)),
    ];
    if let Some(path) = error {
        comments.push(format!("PDF uncertainty: {}", file_name(path)));
    }
    comments.push(format!("temperature: {} K", transform.temperature()));
    if layers.contains(OutputLayer::OppUncertainty) {
        comments.push(format!(
            "OPP uncertainty estimator: {}",
            transform.uncertainty_mode()
        ));
    }
    let shape = pdf.shape();
    comments.push(format!(
        "grid: {} x {} points, x running fastest",
        shape[0], shape[1]
    ));
    comments
}

/// Converts a 2D PDF section (and optionally its error map) into a table of PDF and OPP
/// values, one row per grid point.
///
/// Rows are computed while they are written; the table replaces `output` only after it was
/// written completely.
#[instrument(skip_all, name = "pdf2d_workflow", fields(input = %input.display()))]
pub fn run(
    input: &Path,
    error: Option<&Path>,
    output: &Path,
    config: &TransformConfig,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    let transform = PotentialTransform::from_config(config)?;
    let format = StfFile::new(config.markers.clone());

    let (pdf, error_grid) = reporter.phase("Reading grids", || {
        info!("Reading PDF section.");
        let (pdf, _) = format
            .read_from_path(input)
            .map_err(EngineError::read(input))?;
        let error_grid = match error {
            Some(path) if config.layers.requires_error_map() => {
                info!(error_map = %path.display(), "Reading error map.");
                let (grid, _) = format
                    .read_from_path(path)
                    .map_err(EngineError::read(path))?;
                Some(grid)
            }
            _ => None,
        };
        Ok::<_, EngineError>((pdf, error_grid))
    })?;

    let layers = usable_layers(&config.layers, &pdf, error_grid.as_ref())?;
    if layers != config.layers {
        reporter.report(Progress::Message(
            "Uncertainty layers skipped; see log for details.".to_string(),
        ));
    }
    let sigma = error_grid
        .as_ref()
        .filter(|_| layers.requires_error_map())
        .map(GridDataset::values);

    let reference = Normalization::maximum(pdf.values())?;
    let peak = reference.index.map(|i| pdf.coordinates(i)).unwrap_or_default();
    info!(maximum = reference.value, at = ?peak, "Normalizing to the PDF maximum.");
    if !(reference.value > 0.0) {
        warn!("PDF has no positive values; every potential is undefined.");
    }

    let mut batch = OutputBatch::new();
    let undefined_points = reporter.phase("Writing table", || {
        let comments = header_comments(
            input,
            error.filter(|_| sigma.is_some()),
            &transform,
            &layers,
            &pdf,
        );
        let columns = table_columns(&layers, transform.uncertainty_mode());
        let fill = transform.saturation_value(pdf.values(), &reference);
        let sigma_reference = sigma.map_or(0.0, |s| reference.uncertainty_in(s));

        batch
            .stage(output)
            .map_err(EngineError::io_write(output))?
            .write_with(|w| -> io::Result<usize> {
                let mut table = TableWriter::new(w, &comments, &columns)?;
                let mut ticker = TaskTicker::start(reporter, pdf.len());
                let mut undefined = 0;
                let mut row = Vec::with_capacity(columns.len());
                for (flat, &density) in pdf.values().iter().enumerate() {
                    let deviation = sigma.map_or(0.0, |s| s[flat]);
                    let opp = transform.potential(density, &reference);
                    if opp.is_none() {
                        undefined += 1;
                    }

                    row.clear();
                    row.extend(pdf.coordinates(flat));
                    for layer in layers.iter() {
                        match layer {
                            OutputLayer::Pdf => row.push(density),
                            OutputLayer::PdfUncertainty => row.push(deviation),
                            OutputLayer::Opp => row.push(opp.unwrap_or(fill)),
                            OutputLayer::OppUncertainty => transform
                                .uncertainty(density, deviation, &reference, sigma_reference)
                                .append_to(&mut row),
                        }
                    }
                    table.write_row(&row)?;
                    ticker.tick();
                }
                table.finish()?;
                ticker.finish();
                Ok(undefined)
            })
            .map_err(EngineError::io_write(output))
    })?;

    let outputs = batch.commit().map_err(EngineError::io_write(output))?;
    info!(
        rows = pdf.len(),
        undefined_points,
        output = %output.display(),
        "Potential table written."
    );
    Ok(RunReport {
        outputs,
        layers,
        reference,
        undefined_points,
    })
}
