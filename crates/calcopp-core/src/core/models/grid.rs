use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of spatial axes of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimensionality {
    Two,
    Three,
}

impl Dimensionality {
    pub const fn axes(self) -> usize {
        match self {
            Dimensionality::Two => 2,
            Dimensionality::Three => 3,
        }
    }
}

impl fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimensionality::Two => write!(f, "2D"),
            Dimensionality::Three => write!(f, "3D"),
        }
    }
}

/// The sampled extent of a grid along one axis.
///
/// The first grid point lies at `min` and the last one at `max`; intermediate points are
/// spaced evenly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn extent(&self) -> f64 {
        self.max - self.min
    }

    /// Position of grid point `index` on an axis sampled with `count` points.
    #[inline]
    pub fn coordinate(&self, index: usize, count: usize) -> f64 {
        if count <= 1 {
            return self.min;
        }
        self.min + index as f64 * self.extent() / (count - 1) as f64
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("A {dimensionality} grid requires {expected} axes, but {found} were given")]
    AxisCountMismatch {
        dimensionality: Dimensionality,
        expected: usize,
        found: usize,
    },
    #[error("Axis {axis} of the grid has no sample points")]
    ZeroLengthAxis { axis: usize },
    #[error("A grid of shape {shape:?} requires {expected} values, but {found} were given")]
    ValueCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },
    #[error("A grid of shape {shape:?} has more points than can be addressed")]
    TooManyPoints { shape: Vec<usize> },
}

/// Number of grid points of `shape`, or `None` if the product overflows `usize`.
pub fn point_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// A rectilinear grid of scalar values together with its spatial bounds.
///
/// Values are stored x-fastest: the flat index of grid point `(ix, iy, iz)` is
/// `ix + nx * (iy + ny * iz)`. Every reader and writer in this crate uses this order.
///
/// Shape and bounds are fixed at construction, and the number of values always equals the
/// product of the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDataset {
    dimensionality: Dimensionality,
    shape: Vec<usize>,
    bounds: Vec<AxisBounds>,
    values: Vec<f64>,
}

impl GridDataset {
    pub fn new(
        dimensionality: Dimensionality,
        shape: Vec<usize>,
        bounds: Vec<AxisBounds>,
        values: Vec<f64>,
    ) -> Result<Self, GridError> {
        let axes = dimensionality.axes();
        for found in [shape.len(), bounds.len()] {
            if found != axes {
                return Err(GridError::AxisCountMismatch {
                    dimensionality,
                    expected: axes,
                    found,
                });
            }
        }
        if let Some(axis) = shape.iter().position(|&n| n == 0) {
            return Err(GridError::ZeroLengthAxis { axis });
        }
        let Some(expected) = point_count(&shape) else {
            return Err(GridError::TooManyPoints { shape });
        };
        if values.len() != expected {
            return Err(GridError::ValueCountMismatch {
                shape,
                expected,
                found: values.len(),
            });
        }
        Ok(Self {
            dimensionality,
            shape,
            bounds,
            values,
        })
    }

    /// Builds a grid on the same shape and bounds as `self` with different values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, GridError> {
        Self::new(
            self.dimensionality,
            self.shape.clone(),
            self.bounds.clone(),
            values,
        )
    }

    pub fn dimensionality(&self) -> Dimensionality {
        self.dimensionality
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn bounds(&self) -> &[AxisBounds] {
        &self.bounds
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn flat_index(&self, indices: &[usize]) -> usize {
        indices
            .iter()
            .zip(&self.shape)
            .rev()
            .fold(0, |acc, (&i, &n)| acc * n + i)
    }

    pub fn grid_indices(&self, flat: usize) -> Vec<usize> {
        let mut rest = flat;
        self.shape
            .iter()
            .map(|&n| {
                let i = rest % n;
                rest /= n;
                i
            })
            .collect()
    }

    /// Spatial coordinates of the grid point with the given flat index.
    pub fn coordinates(&self, flat: usize) -> Vec<f64> {
        self.grid_indices(flat)
            .into_iter()
            .zip(self.shape.iter().zip(&self.bounds))
            .map(|(i, (&n, b))| b.coordinate(i, n))
            .collect()
    }
}
