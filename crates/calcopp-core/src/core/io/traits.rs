use crate::core::models::grid::GridDataset;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading text grid formats.
///
/// Implementors carry their format configuration (e.g. section markers), so reading takes
/// `&self`. Metadata holds everything outside the data block that a writer needs to
/// reproduce the file structure. Writers are inherent to the formats that have one and
/// always target a staged output (see [`super::output`]).
pub trait GridFile {
    /// Non-data content preserved for pass-through.
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a grid from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a required section is missing, a value cannot be parsed, or the
    /// underlying reader fails.
    fn read_from(
        &self,
        reader: &mut impl BufRead,
    ) -> Result<(GridDataset, Self::Metadata), Self::Error>;

    /// Reads a grid from a file path.
    fn read_from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(GridDataset, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        self.read_from(&mut reader)
    }
}
