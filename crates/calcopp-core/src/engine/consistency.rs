use super::error::EngineError;
use crate::core::models::grid::{AxisBounds, GridDataset};
use crate::core::models::layers::LayerSelection;
use thiserror::Error;
use tracing::warn;

/// Reason an error map cannot be paired with its density grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Inconsistency {
    #[error("grid shapes differ: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("bounds of axis {axis} differ: expected {expected:?}, found {found:?}")]
    BoundsMismatch {
        axis: usize,
        expected: AxisBounds,
        found: AxisBounds,
    },
}

fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
}

/// Checks that `candidate` samples the same points as `reference`.
///
/// Shapes must match exactly (which implies equal dimensionality); bounds may differ by one
/// unit of relative rounding.
pub fn check(reference: &GridDataset, candidate: &GridDataset) -> Result<(), Inconsistency> {
    if reference.shape() != candidate.shape() {
        return Err(Inconsistency::ShapeMismatch {
            expected: reference.shape().to_vec(),
            found: candidate.shape().to_vec(),
        });
    }
    for (axis, (expected, found)) in reference
        .bounds()
        .iter()
        .zip(candidate.bounds())
        .enumerate()
    {
        if !nearly_equal(expected.min, found.min) || !nearly_equal(expected.max, found.max) {
            return Err(Inconsistency::BoundsMismatch {
                axis,
                expected: *expected,
                found: *found,
            });
        }
    }
    Ok(())
}

/// Narrows `requested` to the layers that can be produced from the available grids.
///
/// Uncertainty layers are dropped with a warning when no error map was supplied or when it
/// does not match the PDF grid. Fails with [`EngineError::NoWork`] if nothing remains.
pub fn usable_layers(
    requested: &LayerSelection,
    pdf: &GridDataset,
    error: Option<&GridDataset>,
) -> Result<LayerSelection, EngineError> {
    let usable = if !requested.requires_error_map() {
        requested.clone()
    } else {
        match error.map(|e| check(pdf, e)) {
            Some(Ok(())) => requested.clone(),
            Some(Err(reason)) => {
                warn!(%reason, "Error map does not match the PDF; uncertainty layers are skipped.");
                requested.without_uncertainty()
            }
            None => {
                warn!("No error map supplied; uncertainty layers are skipped.");
                requested.without_uncertainty()
            }
        }
    };
    if usable.is_empty() {
        return Err(EngineError::NoWork);
    }
    Ok(usable)
}
