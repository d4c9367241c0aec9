use super::{RunReport, file_name, sibling_path};
use crate::core::io::output::OutputBatch;
use crate::core::io::pgrid::{DensityRecords, PgridFile, PgridHeader};
use crate::core::io::vesta::VestaDescriptor;
use crate::core::models::layers::{LayerSelection, OutputLayer};
use crate::engine::config::{Extremum, TransformConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::transform::{Normalization, PotentialTransform};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Converts a scatterer density (binary PGRID, e.g. from a maximum-entropy reconstruction)
/// into a PGRID potential grid plus a VESTA descriptor `<stem>.vesta`.
///
/// Densities are normalized to `config.extremum`; the reference must have the sign of the
/// scatterer's scattering length.
#[instrument(skip_all, name = "density_workflow", fields(input = %input.display()))]
pub fn run(
    input: &Path,
    output: &Path,
    config: &TransformConfig,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    let transform = PotentialTransform::from_config(config)?;
    if let Extremum::Custom(value) = config.extremum {
        if value == 0.0 || !value.is_finite() {
            return Err(EngineError::InvalidExtremum(value));
        }
    }

    let (header, records) = reporter.phase("Reading density", || {
        info!("Reading scatterer density.");
        PgridFile::read_from_path(input).map_err(EngineError::read(input))
    })?;
    info!(
        records = records.values.len(),
        voxels = ?header.voxels,
        title = %header.title,
        "Read density grid."
    );

    let reference = Normalization::from_extremum(&records.values, config.extremum)?;
    info!(
        reference = reference.value,
        extremum = %config.extremum,
        "Normalizing density."
    );

    let mut batch = OutputBatch::new();
    let undefined_points = reporter.phase("Potential", || {
        let layer = transform.potential_layer(&records.values, &reference);
        let Some(highest) = layer.highest_finite() else {
            warn!("No voxel has a defined potential; every value is saturated.");
            return Err(EngineError::EmptyGrid);
        };
        info!(highest, saturation = %transform.saturation(), "Computed potential.");

        let source_title = header.title.trim();
        let title = format!(
            "OPP from {}",
            if source_title.is_empty() {
                file_name(input)
            } else {
                source_title.to_string()
            }
        );
        let opp_header = PgridHeader {
            title: title.clone(),
            values_per_record: 1,
            record_count: records.values.len() as i32,
            ..header.clone()
        };
        let opp_records = DensityRecords {
            indices: records.indices.clone(),
            values: transform.materialize(&layer),
        };
        batch
            .stage(output)
            .map_err(EngineError::io_write(output))?
            .write_with(|w| PgridFile::write_to(&opp_header, &opp_records, w))
            .map_err(EngineError::write(output))?;

        let descriptor = VestaDescriptor {
            title,
            grid_file_name: file_name(output),
            isosurface_level: layer.isosurface_level(),
        };
        let vesta = sibling_path(output, "", "vesta");
        batch
            .stage(&vesta)
            .map_err(EngineError::io_write(&vesta))?
            .write_with(|w| descriptor.write_to(w))
            .map_err(EngineError::io_write(&vesta))?;
        Ok(layer.undefined_count())
    })?;

    let outputs = batch.commit().map_err(EngineError::io_write(output))?;
    info!(undefined_points, output = %output.display(), "Potential grid written.");
    Ok(RunReport {
        outputs,
        layers: LayerSelection::from_requested([OutputLayer::Opp]),
        reference,
        undefined_points,
    })
}
