use super::{RunReport, file_name, sibling_path};
use crate::core::io::output::OutputBatch;
use crate::core::io::traits::GridFile;
use crate::core::io::vesta::VestaDescriptor;
use crate::core::io::xsf::{XsfFile, XsfMetadata};
use crate::core::models::grid::GridDataset;
use crate::core::models::layers::OutputLayer;
use crate::engine::config::TransformConfig;
use crate::engine::consistency::usable_layers;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::transform::{Normalization, PotentialTransform, UncertaintyLayers};
use std::path::Path;
use tracing::{info, instrument};

fn stage_grid(
    batch: &mut OutputBatch,
    path: &Path,
    grid: &GridDataset,
    metadata: &XsfMetadata,
) -> Result<(), EngineError> {
    info!(path = %path.display(), "Writing 3D grid.");
    batch
        .stage(path)
        .map_err(EngineError::io_write(path))?
        .write_with(|w| XsfFile.write_to(grid, metadata, w))
        .map_err(EngineError::write(path))
}

/// Converts a 3D PDF volume into XSF potential grids.
///
/// The OPP grid goes to `output`, accompanied by a VESTA descriptor `<stem>.vesta`.
/// Uncertainties go to `<stem>_err.xsf` (symmetric) or `<stem>_err_upper.xsf` and
/// `<stem>_err_lower.xsf` (asymmetric). PDF layers are inputs here and are not re-emitted.
#[instrument(skip_all, name = "pdf3d_workflow", fields(input = %input.display()))]
pub fn run(
    input: &Path,
    error: Option<&Path>,
    output: &Path,
    config: &TransformConfig,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    let transform = PotentialTransform::from_config(config)?;

    let ((pdf, metadata), error_grid) = reporter.phase("Reading grids", || {
        info!("Reading PDF volume.");
        let pdf = XsfFile
            .read_from_path(input)
            .map_err(EngineError::read(input))?;
        let error_grid = match error {
            Some(path) if config.layers.requires_error_map() => {
                info!(error_map = %path.display(), "Reading error map.");
                let (grid, _) = XsfFile
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
    for layer in [OutputLayer::Pdf, OutputLayer::PdfUncertainty] {
        if layers.contains(layer) {
            info!(%layer, "Input layer is not written again for 3D grids.");
        }
    }
    let write_opp = layers.contains(OutputLayer::Opp);
    let uncertainty_source = error_grid
        .as_ref()
        .filter(|_| layers.contains(OutputLayer::OppUncertainty));
    if !write_opp && uncertainty_source.is_none() {
        return Err(EngineError::NoWork);
    }

    let reference = Normalization::maximum(pdf.values())?;
    let peak = reference.index.map(|i| pdf.coordinates(i)).unwrap_or_default();
    info!(maximum = reference.value, at = ?peak, "Normalizing to the PDF maximum.");

    let title = metadata
        .title()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| file_name(input));

    let mut batch = OutputBatch::new();
    let mut undefined_points = 0;

    if write_opp {
        reporter.phase("Potential", || {
            let layer = transform.potential_layer(pdf.values(), &reference);
            undefined_points = layer.undefined_count();
            let opp_title = format!("OPP from {}", title);
            let grid = pdf.with_values(transform.materialize(&layer))?;
            stage_grid(&mut batch, output, &grid, &metadata.retitled(&opp_title))?;

            let descriptor = VestaDescriptor {
                title: opp_title,
                grid_file_name: file_name(output),
                isosurface_level: layer.isosurface_level(),
            };
            let vesta = sibling_path(output, "", "vesta");
            batch
                .stage(&vesta)
                .map_err(EngineError::io_write(&vesta))?
                .write_with(|w| descriptor.write_to(w))
                .map_err(EngineError::io_write(&vesta))
        })?;
    }

    if let Some(error_grid) = uncertainty_source {
        reporter.phase("Potential uncertainty", || {
            match transform.uncertainty_layers(pdf.values(), error_grid.values(), &reference) {
                UncertaintyLayers::Symmetric(values) => stage_grid(
                    &mut batch,
                    &sibling_path(output, "_err", "xsf"),
                    &pdf.with_values(values)?,
                    &metadata.retitled(&format!("OPP uncertainty from {}", title)),
                ),
                UncertaintyLayers::Asymmetric { upper, lower } => {
                    stage_grid(
                        &mut batch,
                        &sibling_path(output, "_err_upper", "xsf"),
                        &pdf.with_values(upper)?,
                        &metadata.retitled(&format!("OPP uncertainty + from {}", title)),
                    )?;
                    stage_grid(
                        &mut batch,
                        &sibling_path(output, "_err_lower", "xsf"),
                        &pdf.with_values(lower)?,
                        &metadata.retitled(&format!("OPP uncertainty - from {}", title)),
                    )
                }
            }
        })?;
    }

    let outputs = batch.commit().map_err(EngineError::io_write(output))?;
    info!(files = outputs.len(), undefined_points, "Potential grids written.");
    Ok(RunReport {
        outputs,
        layers,
        reference,
        undefined_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::layers::LayerSelection;
    use crate::engine::config::{TransformConfigBuilder, UncertaintyMode};
    use std::fs;
    use std::path::PathBuf;

    fn xsf(values: &str, dims: &str) -> String {
        format!(
            "\
CRYSTAL
PRIMVEC
  4.0 0.0 0.0
  0.0 4.0 0.0
  0.0 0.0 4.0
BEGIN_BLOCK_DATAGRID_3D
  jpdf_Li1
  BEGIN_DATAGRID_3D_pdf
    {dims}
    0.0 0.0 0.0
    4.0 0.0 0.0
    0.0 4.0 0.0
    0.0 0.0 4.0
    {values}
  END_DATAGRID_3D
END_BLOCK_DATAGRID_3D
"
        )
    }

    fn setup(dir: &Path, error_dims: Option<&str>) -> (PathBuf, Option<PathBuf>) {
        let input = dir.join("li.xsf");
        fs::write(&input, xsf("1 2 3 4 5 6 7 8", "2 2 2")).unwrap();
        let error = error_dims.map(|dims| {
            let path = dir.join("li_err_in.xsf");
            let values = if dims == "2 2 2" {
                "0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.8"
            } else {
                "0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.1 0.1"
            };
            fs::write(&path, xsf(values, dims)).unwrap();
            path
        });
        (input, error)
    }

    fn config(layers: &[OutputLayer], mode: UncertaintyMode) -> TransformConfig {
        TransformConfigBuilder::new()
            .temperature(300.0)
            .uncertainty_mode(mode)
            .layers(LayerSelection::from_requested(layers.iter().copied()))
            .build()
            .unwrap()
    }

    #[test]
    fn potential_grid_and_descriptor_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let (input, _) = setup(dir.path(), None);
        let output = dir.path().join("opp.xsf");

        let report = run(
            &input,
            None,
            &output,
            &config(&[], UncertaintyMode::Asymmetric),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(
            report.outputs,
            vec![output.clone(), dir.path().join("opp.vesta")]
        );
        assert_eq!(report.reference.index, Some(7));

        let (grid, metadata) = XsfFile.read_from_path(&output).unwrap();
        assert_eq!(grid.shape(), &[2, 2, 2]);
        assert_eq!(grid.values()[7], 0.0);
        assert!(grid.values()[0] > grid.values()[1]);
        assert_eq!(metadata.title(), Some("OPP from jpdf_Li1"));
        assert_eq!(metadata.footer_lines, vec!["END_BLOCK_DATAGRID_3D"]);

        let vesta = fs::read_to_string(dir.path().join("opp.vesta")).unwrap();
        assert!(vesta.contains("+1.000000e+00 opp.xsf"));
        assert!(vesta.contains("OPP from jpdf_Li1"));
    }

    #[test]
    fn asymmetric_uncertainty_goes_to_upper_and_lower_files() {
        let dir = tempfile::tempdir().unwrap();
        let (input, error) = setup(dir.path(), Some("2 2 2"));
        let output = dir.path().join("opp.xsf");

        let report = run(
            &input,
            error.as_deref(),
            &output,
            &config(&[OutputLayer::OppUncertainty], UncertaintyMode::Asymmetric),
            &ProgressReporter::new(),
        )
        .unwrap();
        let upper = dir.path().join("opp_err_upper.xsf");
        let lower = dir.path().join("opp_err_lower.xsf");
        assert_eq!(report.outputs, vec![upper.clone(), lower.clone()]);
        assert!(!output.exists());

        let (upper_grid, metadata) = XsfFile.read_from_path(&upper).unwrap();
        let (lower_grid, _) = XsfFile.read_from_path(&lower).unwrap();
        assert!(upper_grid.values().iter().all(|&v| v > 0.0));
        assert!(lower_grid.values().iter().all(|&v| v < 0.0));
        assert_eq!(metadata.title(), Some("OPP uncertainty + from jpdf_Li1"));
    }

    #[test]
    fn symmetric_uncertainty_goes_to_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let (input, error) = setup(dir.path(), Some("2 2 2"));
        let output = dir.path().join("opp.xsf");

        let report = run(
            &input,
            error.as_deref(),
            &output,
            &config(&[], UncertaintyMode::Symmetric),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(report.outputs.len(), 3);
        assert!(dir.path().join("opp_err.xsf").exists());
    }

    #[test]
    fn inconsistent_error_map_still_writes_the_potential() {
        let dir = tempfile::tempdir().unwrap();
        let (input, error) = setup(dir.path(), Some("2 2 3"));
        let output = dir.path().join("opp.xsf");

        let report = run(
            &input,
            error.as_deref(),
            &output,
            &config(&[], UncertaintyMode::Asymmetric),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(report.outputs.len(), 2);
        assert!(!dir.path().join("opp_err_upper.xsf").exists());
    }

    #[test]
    fn untitled_input_gets_a_title_and_stays_readable() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("li.xsf");
        fs::write(
            &input,
            xsf("1 2 3 4 5 6 7 8", "2 2 2").replace("  jpdf_Li1\n", ""),
        )
        .unwrap();
        let output = dir.path().join("opp.xsf");

        run(
            &input,
            None,
            &output,
            &config(&[OutputLayer::Opp], UncertaintyMode::Asymmetric),
            &ProgressReporter::new(),
        )
        .unwrap();
        let (grid, metadata) = XsfFile.read_from_path(&output).unwrap();
        assert_eq!(grid.shape(), &[2, 2, 2]);
        assert_eq!(metadata.title(), Some("OPP from li.xsf"));
        assert!(
            metadata
                .header_lines
                .iter()
                .any(|l| l.trim() == "BEGIN_DATAGRID_3D_pdf")
        );
    }

    #[test]
    fn pdf_only_request_is_no_work_in_3d() {
        let dir = tempfile::tempdir().unwrap();
        let (input, _) = setup(dir.path(), None);
        let result = run(
            &input,
            None,
            &dir.path().join("opp.xsf"),
            &config(&[OutputLayer::Pdf], UncertaintyMode::Asymmetric),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::NoWork)));
    }

    #[test]
    fn repeated_runs_produce_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let (input, error) = setup(dir.path(), Some("2 2 2"));
        let output = dir.path().join("opp.xsf");
        let config = config(&[], UncertaintyMode::Asymmetric);

        let first = run(&input, error.as_deref(), &output, &config, &ProgressReporter::new())
            .unwrap()
            .outputs
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect::<Vec<_>>();
        let second = run(&input, error.as_deref(), &output, &config, &ProgressReporter::new())
            .unwrap()
            .outputs
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}
