use super::error::GridFileError;
use super::scanner::Tokenizer;
use super::traits::GridFile;
use crate::core::models::grid::{AxisBounds, Dimensionality, GridDataset};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, trace};

/// Keywords that open the sections of a 2D structured grid file.
///
/// A marker is recognized when it is the first whitespace-delimited token of a line; the
/// match is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionMarkers {
    pub dimensions: String,
    pub bounds: String,
    pub data: String,
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self {
            dimensions: "DIMENSIONS".to_string(),
            bounds: "BOUNDS".to_string(),
            data: "DATA".to_string(),
        }
    }
}

/// Reader for 2D structured grid (STF) files.
///
/// Layout: arbitrary preamble, then `DIMENSIONS nx ny`, `BOUNDS xmin xmax ymin ymax`, and
/// `DATA` followed by `nx * ny` values, x fastest. Numbers of a section may continue on the
/// following lines; anything between sections is ignored.
#[derive(Debug, Clone, Default)]
pub struct StfFile {
    markers: SectionMarkers,
}

impl StfFile {
    pub fn new(markers: SectionMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &SectionMarkers {
        &self.markers
    }

    fn missing(section: &'static str, marker: &str) -> GridFileError {
        GridFileError::Structure {
            section,
            expected: format!("marker '{}'", marker),
        }
    }
}

impl GridFile for StfFile {
    type Metadata = ();
    type Error = GridFileError;

    fn read_from(
        &self,
        reader: &mut impl BufRead,
    ) -> Result<(GridDataset, Self::Metadata), Self::Error> {
        let markers = &self.markers;
        let mut tokens = Tokenizer::new(reader);
        if !tokens.seek_marker(&markers.dimensions, |line| trace!(line, "Skipping preamble."))? {
            return Err(Self::missing("dimensions", &markers.dimensions));
        }
        let shape = tokens.take_counts(2, "dimensions")?;
        let count = tokens.point_count(&shape, "dimensions")?;
        tokens.discard_rest_of_line();

        if !tokens.seek_marker(&markers.bounds, |_| {})? {
            return Err(Self::missing("bounds", &markers.bounds));
        }
        let raw_bounds = tokens.take_reals(4, "bounds")?;
        tokens.discard_rest_of_line();
        let bounds = raw_bounds
            .chunks_exact(2)
            .map(|pair| AxisBounds::new(pair[0], pair[1]))
            .collect();

        if !tokens.seek_marker(&markers.data, |_| {})? {
            return Err(Self::missing("data", &markers.data));
        }
        let values = tokens.take_reals(count, "data")?;

        debug!(
            shape = ?shape,
            bounds = ?raw_bounds,
            lines = tokens.line_number(),
            "Parsed 2D grid."
        );
        let grid = GridDataset::new(Dimensionality::Two, shape, bounds, values)?;
        Ok((grid, ()))
    }
}
