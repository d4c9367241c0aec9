use super::error::{FormatErrorKind, GridFileError};
use super::scanner::{Tokenizer, parse_real, value_buffer};
use super::traits::GridFile;
use crate::core::models::grid::{AxisBounds, Dimensionality, GridDataset};
use nalgebra::Vector3;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const BLOCK_BEGIN: &str = "BEGIN_BLOCK_DATAGRID_3D";
const GRID_BEGIN: &str = "BEGIN_DATAGRID_3D";
const GRID_END: &str = "END_DATAGRID_3D";
const VALUES_PER_LINE: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct XsfMetadata {
    /// All lines up to and including the `BEGIN_DATAGRID_3D` line.
    pub header_lines: Vec<String>,
    /// Index of the dataset title line in `header_lines`.
    pub title_index: Option<usize>,
    /// Dimensions, origin, and spanning-vector lines, verbatim.
    pub geometry_lines: Vec<String>,
    pub origin: Vector3<f64>,
    pub spanning_vectors: [Vector3<f64>; 3],
    /// The `END_DATAGRID_3D` line, if the input had one.
    pub terminator: Option<String>,
    /// Everything after the terminator (or after the data, if it was missing).
    pub footer_lines: Vec<String>,
}

impl XsfMetadata {
    pub fn title(&self) -> Option<&str> {
        self.title_index
            .and_then(|i| self.header_lines.get(i))
            .map(|l| l.trim())
    }

    /// A copy whose dataset title line reads `title`, keeping the original indentation.
    ///
    /// A block without a title gets one inserted right after `BEGIN_BLOCK_DATAGRID_3D`;
    /// without a block line the header is left as is.
    pub fn retitled(&self, title: &str) -> Self {
        let mut metadata = self.clone();
        if let Some(line) = self.title_index.and_then(|i| metadata.header_lines.get_mut(i)) {
            *line = format!("{}{}", indentation(line), title);
        } else if let Some(block) = self
            .header_lines
            .iter()
            .position(|l| l.trim_start().starts_with(BLOCK_BEGIN))
        {
            let indent = self
                .header_lines
                .get(block + 1)
                .map_or("", |l| indentation(l));
            metadata
                .header_lines
                .insert(block + 1, format!("{}{}", indent, title));
            metadata.title_index = Some(block + 1);
        }
        metadata
    }
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Reader and writer for the first 3D data grid of an XCrySDen structure (XSF) file.
///
/// Everything outside the data block is kept verbatim in [`XsfMetadata`], so a derived grid
/// can be written with the original structure, geometry, and trailing blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct XsfFile;

fn parse_vector(
    line: Option<String>,
    line_number: usize,
    section: &'static str,
) -> Result<(String, Vector3<f64>), GridFileError> {
    let line = line.ok_or_else(|| GridFileError::Structure {
        section,
        expected: "a line of three reals".to_string(),
    })?;
    let mut components = [0.0; 3];
    let mut tokens = line.split_whitespace();
    for c in components.iter_mut() {
        let text = tokens.next().unwrap_or_default();
        *c = text.parse().map_err(|_| GridFileError::Format {
            line: line_number,
            kind: FormatErrorKind::InvalidReal {
                section,
                value: text.to_string(),
            },
        })?;
    }
    Ok((line, Vector3::from(components)))
}

/// Axis bounds along the spanning vectors: the origin projected onto each direction and the
/// vector length as extent.
fn axis_bounds(origin: &Vector3<f64>, span: &Vector3<f64>) -> AxisBounds {
    match span.try_normalize(f64::EPSILON) {
        Some(unit) => {
            let min = origin.dot(&unit);
            AxisBounds::new(min, min + span.norm())
        }
        None => AxisBounds::new(0.0, 0.0),
    }
}

impl GridFile for XsfFile {
    type Metadata = XsfMetadata;
    type Error = GridFileError;

    fn read_from(
        &self,
        reader: &mut impl BufRead,
    ) -> Result<(GridDataset, Self::Metadata), Self::Error> {
        let mut tokens = Tokenizer::new(reader);
        let mut header_lines = Vec::new();
        let mut title_index = None;
        let mut after_block_begin = false;

        loop {
            let Some(line) = tokens.next_line()? else {
                return Err(GridFileError::Structure {
                    section: "3D data grid",
                    expected: format!("'{}' line", GRID_BEGIN),
                });
            };
            let trimmed = line.trim_start();
            let is_grid_begin = trimmed.starts_with(GRID_BEGIN);
            if after_block_begin && !is_grid_begin && title_index.is_none() {
                title_index = Some(header_lines.len());
            }
            after_block_begin = trimmed.starts_with(BLOCK_BEGIN);
            header_lines.push(line);
            if is_grid_begin {
                break;
            }
        }

        let dims_line = tokens.next_nonblank_line()?.ok_or_else(|| GridFileError::Structure {
            section: "grid dimensions",
            expected: "a line of three counts".to_string(),
        })?;
        let mut shape = Vec::with_capacity(3);
        let mut dims_tokens = dims_line.split_whitespace();
        for _ in 0..3 {
            let text = dims_tokens.next().unwrap_or_default();
            match text.parse::<usize>() {
                Ok(n) if n > 0 => shape.push(n),
                _ => {
                    return Err(GridFileError::Format {
                        line: tokens.line_number(),
                        kind: FormatErrorKind::InvalidCount {
                            section: "grid dimensions",
                            value: text.to_string(),
                        },
                    });
                }
            }
        }

        let (origin_line, origin) = parse_vector(
            tokens.next_nonblank_line()?,
            tokens.line_number(),
            "grid origin",
        )?;
        let mut geometry_lines = vec![dims_line, origin_line];
        let mut spanning_vectors = [Vector3::zeros(); 3];
        for span in spanning_vectors.iter_mut() {
            let (line, vector) = parse_vector(
                tokens.next_nonblank_line()?,
                tokens.line_number(),
                "spanning vectors",
            )?;
            geometry_lines.push(line);
            *span = vector;
        }

        let expected = tokens.point_count(&shape, "grid dimensions")?;
        let mut values = value_buffer(expected);
        let mut surplus = 0usize;
        let mut terminator = None;
        let mut footer_lines = Vec::new();

        loop {
            let Some(token) = tokens.next_token()? else {
                warn!(
                    "No '{}' terminator found; the data block runs to the end of input.",
                    GRID_END
                );
                break;
            };
            if token.leading && token.text.parse::<f64>().is_err() {
                let line = tokens.current_line().to_string();
                if line.trim_start().starts_with(GRID_END) {
                    terminator = Some(line);
                } else {
                    warn!(
                        line = token.line,
                        "No '{}' terminator found; the data block ends before '{}'.",
                        GRID_END,
                        line.trim()
                    );
                    footer_lines.push(line);
                }
                footer_lines.extend(tokens.remaining_lines()?);
                break;
            }
            let value = parse_real(&token, "data")?;
            if values.len() < expected {
                values.push(value);
            } else {
                surplus += 1;
            }
        }

        if values.len() < expected {
            return Err(GridFileError::Format {
                line: tokens.line_number(),
                kind: FormatErrorKind::Truncated {
                    section: "data",
                    expected,
                    found: values.len(),
                },
            });
        }
        if surplus > 0 {
            warn!(
                surplus,
                "Data block holds more values than the grid dimensions require; ignoring the rest."
            );
        }

        let bounds = spanning_vectors
            .iter()
            .map(|span| axis_bounds(&origin, span))
            .collect();
        debug!(shape = ?shape, origin = ?origin, "Parsed 3D data grid.");

        let grid = GridDataset::new(Dimensionality::Three, shape, bounds, values)?;
        let metadata = XsfMetadata {
            header_lines,
            title_index,
            geometry_lines,
            origin,
            spanning_vectors,
            terminator,
            footer_lines,
        };
        Ok((grid, metadata))
    }
}

impl XsfFile {
    /// Writes `grid` inside the structure recorded in `metadata`, in the order
    /// [`GridFile::read_from`] reads it back.
    pub fn write_to(
        &self,
        grid: &GridDataset,
        metadata: &XsfMetadata,
        writer: &mut impl Write,
    ) -> Result<(), GridFileError> {
        for line in metadata
            .header_lines
            .iter()
            .chain(&metadata.geometry_lines)
        {
            writeln!(writer, "{}", line)?;
        }
        for chunk in grid.values().chunks(VALUES_PER_LINE) {
            let line: Vec<String> = chunk.iter().map(|v| format!("{:.8e}", v)).collect();
            writeln!(writer, "    {}", line.join("  "))?;
        }
        match &metadata.terminator {
            Some(line) => writeln!(writer, "{}", line)?,
            None => writeln!(writer, "  {}", GRID_END)?,
        }
        for line in &metadata.footer_lines {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}
