//! # Workflows Module
//!
//! Complete pipelines from input grid files to committed output files. Each workflow
//! validates its parameters first, reads its inputs, narrows the requested layers to what
//! the inputs support, derives the potential layers, and writes all outputs through staged
//! temporary files that only replace their targets once every output was written.
//!
//! - **2D sections** ([`pdf2d`]) - STF grids to a plain-text table.
//! - **3D volumes** ([`pdf3d`]) - XSF grids to XSF potential grids and a VESTA descriptor.
//! - **Scatterer densities** ([`density`]) - binary PGRID files to a PGRID potential.

use crate::core::models::layers::LayerSelection;
use crate::engine::transform::Normalization;
use std::path::{Path, PathBuf};

pub mod density;
pub mod pdf2d;
pub mod pdf3d;

/// Outcome of a successful workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Committed output files in the order they were written.
    pub outputs: Vec<PathBuf>,
    pub layers: LayerSelection,
    pub reference: Normalization,
    /// Grid points whose potential is undefined and was saturated.
    pub undefined_points: usize,
}

/// `<dir>/<stem of path><suffix>.<extension>`
pub(crate) fn sibling_path(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_paths_share_directory_and_stem() {
        let output = Path::new("out/li_opp.xsf");
        assert_eq!(
            sibling_path(output, "_err_upper", "xsf"),
            PathBuf::from("out/li_opp_err_upper.xsf")
        );
        assert_eq!(sibling_path(output, "", "vesta"), PathBuf::from("out/li_opp.vesta"));
        assert_eq!(file_name(output), "li_opp.xsf");
    }
}
