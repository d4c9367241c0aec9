use crate::core::models::grid::GridError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing {section} section: {expected} not found before end of input")]
    Structure {
        section: &'static str,
        expected: String,
    },
    #[error("Parse error on line {line}: {kind}")]
    Format { line: usize, kind: FormatErrorKind },
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
}

#[derive(Debug, Error, PartialEq)]
pub enum FormatErrorKind {
    #[error("'{value}' in the {section} section is not a positive integer")]
    InvalidCount {
        section: &'static str,
        value: String,
    },
    #[error("'{value}' in the {section} section is not a real number")]
    InvalidReal {
        section: &'static str,
        value: String,
    },
    #[error("the {section} section ended after {found} of {expected} values")]
    Truncated {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("the {section} section declares a grid of shape {shape:?}, which has too many points")]
    TooManyPoints {
        section: &'static str,
        shape: Vec<usize>,
    },
    #[error("unsupported {field} value {value} in binary header")]
    UnsupportedHeader { field: &'static str, value: i64 },
}
