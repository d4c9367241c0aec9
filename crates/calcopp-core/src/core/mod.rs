//! # Core Module
//!
//! Fundamental building blocks shared by every pipeline.
//!
//! - **Grid Representation** ([`models`]) - Rectilinear grids, axis bounds, and output layers
//! - **Potential Formulas** ([`potential`]) - Physical constants and the pointwise OPP transform
//! - **File I/O** ([`io`]) - STF, XSF, and PGRID readers/writers plus staged output files

pub mod io;
pub mod models;
pub mod potential;
