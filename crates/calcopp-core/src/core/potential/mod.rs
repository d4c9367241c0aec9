//! Boltzmann-type potential formulas.
//!
//! The effective one-particle potential of a position `u` follows from the probability
//! density relative to its reference (usually the global maximum):
//!
//! ```text
//! V(u) = -k_B T ln(pdf(u) / pdf_max)
//! ```
//!
//! Positions whose relative density is not positive are physically inaccessible. The formulas
//! report them as undefined (`None`) and leave the choice of a stand-in value to the caller.

pub mod constants;
pub mod formulas;
