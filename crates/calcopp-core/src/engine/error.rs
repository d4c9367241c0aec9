use super::config::ConfigError;
use crate::core::io::error::GridFileError;
use crate::core::models::grid::GridError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Temperature must be a finite positive number of kelvins, got {0}")]
    InvalidTemperature(f64),

    #[error("The density grid contains no usable values")]
    EmptyGrid,

    #[error("Reference density must be finite and non-zero, got {0}")]
    InvalidExtremum(f64),

    #[error("None of the requested output layers can be produced")]
    NoWork,

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: GridFileError,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: GridFileError,
    },

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(GridFileError) -> Self {
        let path = path.into();
        move |source| EngineError::Read { path, source }
    }

    pub(crate) fn write<E>(path: impl Into<PathBuf>) -> impl FnOnce(E) -> Self
    where
        E: Into<GridFileError>,
    {
        let path = path.into();
        move |source| EngineError::Write {
            path,
            source: source.into(),
        }
    }

    pub(crate) fn io_write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        Self::write::<io::Error>(path)
    }
}
