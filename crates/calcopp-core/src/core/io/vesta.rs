use std::io::{self, Write};

/// Minimal VESTA project file that opens a volumetric grid with a suggested isosurface.
///
/// Sections are switched off since the high potential in most of the cell would hide the
/// region of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct VestaDescriptor {
    pub title: String,
    /// File name of the grid, relative to the descriptor's directory.
    pub grid_file_name: String,
    /// Suggested isosurface level in eV.
    pub isosurface_level: f64,
}

impl VestaDescriptor {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "#VESTA_FORMAT_VERSION 3.5.0")?;
        writeln!(writer)?;
        writeln!(writer, "IMPORT_DENSITY 1")?;
        writeln!(writer, "+1.000000e+00 {}", self.grid_file_name)?;
        writeln!(writer)?;
        writeln!(writer, "TITLE")?;
        writeln!(writer, "{}", self.title)?;
        writeln!(writer)?;
        writeln!(writer, "SECTS  96  0")?;
        writeln!(writer, "ISURF")?;
        writeln!(
            writer,
            "  1   1  {:.6e}  255 255   0 127 255",
            self.isosurface_level
        )?;
        writeln!(writer, "  0   0   0   0")?;
        Ok(())
    }
}
