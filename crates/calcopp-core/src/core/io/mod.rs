//! Provides input/output functionality for grid file formats.
//!
//! Text grids are parsed with a single forward-scanning tokenizer ([`scanner`]) and exposed
//! through the [`traits::GridFile`] interface. Outputs are staged in temporary files
//! ([`output`]) and only moved into place once a run has fully succeeded.

pub mod error;
pub mod output;
pub mod pgrid;
pub(crate) mod scanner;
pub mod stf;
pub mod table;
pub mod traits;
pub mod vesta;
pub mod xsf;
