//! Grid data structures.
//!
//! [`grid::GridDataset`] is the in-memory representation of every scalar field handled by the
//! library (PDFs, error maps, and derived potentials). [`layers`] describes which derived
//! quantities a run should emit.

pub mod grid;
pub mod layers;
