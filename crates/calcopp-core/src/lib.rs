//! # CalcOPP Core Library
//!
//! Calculation of effective one-particle potentials (OPPs) from probability-density
//! functions (PDFs) sampled on regular grids and from scatterer densities reconstructed
//! with maximum-entropy methods.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless grid models (`GridDataset`), the pointwise
//!   Boltzmann-type potential formulas, and readers/writers for the supported grid formats.
//!
//! - **[`engine`]: The Numerical Engine.** Configuration, grid consistency checks, and the
//!   `PotentialTransform` that turns a PDF (and an optional error map) into OPP layers.
//!
//! - **[`workflows`]: The Public API.** Complete read → validate → transform → write
//!   pipelines for 2D sections, 3D volumes, and binary scatterer-density grids.

pub mod core;
pub mod engine;
pub mod workflows;
