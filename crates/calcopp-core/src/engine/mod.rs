//! # Engine Module
//!
//! Numerical core of CalcOPP: everything between a parsed grid and a derived output layer.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Temperature, uncertainty estimator, saturation policy,
//!   requested layers, and section markers, assembled with a builder.
//! - **Consistency** ([`consistency`]) - Decides whether an error map can be paired with its
//!   PDF and narrows the requested layers accordingly.
//! - **Transform** ([`transform`]) - Normalization and the Boltzmann inversion of densities
//!   into potentials and potential uncertainties.
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events for front ends.
//! - **Error Handling** ([`error`]) - The fatal errors a workflow can end with.
//!
//! Undefined potentials stay `None` throughout the engine and are only replaced by a
//! saturation value when a layer is materialized for output.

pub mod config;
pub mod consistency;
pub mod error;
pub mod progress;
pub mod transform;
