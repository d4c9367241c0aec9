use super::error::{FormatErrorKind, GridFileError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const SUPPORTED_VERSION: [i32; 4] = [3, 0, 0, 0];
const TITLE_FIELD_BYTES: usize = 80;
/// Longest title that still leaves room for the terminating NUL.
pub const MAX_TITLE_BYTES: usize = TITLE_FIELD_BYTES - 1;
const CELL_DIMENSIONS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Values only, one record per voxel.
    Raw,
    /// Voxel index followed by the value(s), covering the asymmetric unit.
    Indexed,
}

impl RecordLayout {
    fn code(self) -> i32 {
        match self {
            RecordLayout::Raw => 0,
            RecordLayout::Indexed => 1,
        }
    }
}

/// Symmetry information stored in indexed files.
#[derive(Debug, Clone, PartialEq)]
pub struct PgridSymmetry {
    pub centrosymmetric: i32,
    pub centering_operations: i32,
    /// 3 × 3 rotation followed by a translation vector, row by row.
    pub operators: Vec<[i32; 12]>,
    pub centering_vector: [i32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgridHeader {
    pub version: [i32; 4],
    pub title: String,
    /// `0` for general grids, `1` for periodic grids.
    pub grid_type: i32,
    pub layout: RecordLayout,
    /// `1` for a single value per record, `2` for separate positive and negative parts.
    pub values_per_record: i32,
    pub voxels: [i32; 3],
    pub record_count: i32,
    /// a/Å, b/Å, c/Å, α/°, β/°, γ/°
    pub cell: [f32; 6],
    pub symmetry: Option<PgridSymmetry>,
}

/// Density values in file order, with voxel indices for indexed files.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityRecords {
    pub indices: Option<Vec<i32>>,
    pub values: Vec<f64>,
}

/// Truncates `title` to at most `max_bytes` bytes without splitting a UTF-8 character.
pub fn truncate_title(title: &str, max_bytes: usize) -> &str {
    if title.len() <= max_bytes {
        return title;
    }
    let mut end = max_bytes;
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    &title[..end]
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[i32; N]> {
    let mut values = [0; N];
    reader.read_i32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

fn unsupported(field: &'static str, value: i32) -> GridFileError {
    GridFileError::Format {
        line: 0,
        kind: FormatErrorKind::UnsupportedHeader {
            field,
            value: value.into(),
        },
    }
}

fn truncated_header(e: io::Error) -> GridFileError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        GridFileError::Structure {
            section: "binary header",
            expected: "a complete PGRID header".to_string(),
        }
    } else {
        GridFileError::Io(e)
    }
}

/// Reader and writer for binary Dysnomia periodic/general grid files (little-endian).
#[derive(Debug, Clone, Copy, Default)]
pub struct PgridFile;

impl PgridFile {
    pub fn read_header(reader: &mut impl Read) -> Result<PgridHeader, GridFileError> {
        let version = read_array::<4>(reader).map_err(truncated_header)?;
        if version != SUPPORTED_VERSION {
            warn!(version = ?version, "Unsupported PGRID version; trying to read anyway.");
        }

        let mut title_raw = [0u8; TITLE_FIELD_BYTES];
        reader.read_exact(&mut title_raw).map_err(truncated_header)?;
        let title_end = title_raw
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TITLE_FIELD_BYTES);
        let title = String::from_utf8_lossy(&title_raw[..title_end]).into_owned();

        let [grid_type, layout_code, values_per_record, ndim] =
            read_array::<4>(reader).map_err(truncated_header)?;
        let layout = match layout_code {
            0 => RecordLayout::Raw,
            1 => RecordLayout::Indexed,
            other => return Err(unsupported("record type", other)),
        };
        if !matches!(values_per_record, 1 | 2) {
            return Err(unsupported("values per record", values_per_record));
        }
        if ndim != CELL_DIMENSIONS {
            return Err(unsupported("cell dimension", ndim));
        }
        let voxels = read_array::<3>(reader).map_err(truncated_header)?;
        let [record_count] = read_array::<1>(reader).map_err(truncated_header)?;
        let mut cell = [0f32; 6];
        reader
            .read_f32_into::<LittleEndian>(&mut cell)
            .map_err(truncated_header)?;

        let symmetry = match layout {
            RecordLayout::Raw => None,
            RecordLayout::Indexed => {
                let [npos, centrosymmetric, centering_operations] =
                    read_array::<3>(reader).map_err(truncated_header)?;
                if npos < 0 {
                    return Err(unsupported("symmetry operator count", npos));
                }
                let operators = (0..npos)
                    .map(|_| read_array::<12>(reader))
                    .collect::<io::Result<Vec<_>>>()
                    .map_err(truncated_header)?;
                let centering_vector = read_array::<3>(reader).map_err(truncated_header)?;
                Some(PgridSymmetry {
                    centrosymmetric,
                    centering_operations,
                    operators,
                    centering_vector,
                })
            }
        };

        Ok(PgridHeader {
            version,
            title,
            grid_type,
            layout,
            values_per_record,
            voxels,
            record_count,
            cell,
            symmetry,
        })
    }

    pub fn read_from(
        reader: &mut impl Read,
    ) -> Result<(PgridHeader, DensityRecords), GridFileError> {
        let header = Self::read_header(reader)?;

        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        let index_bytes = if header.layout == RecordLayout::Indexed { 4 } else { 0 };
        let record_bytes = index_bytes + 4 * header.values_per_record as usize;

        let chunks = body.chunks_exact(record_bytes);
        if !chunks.remainder().is_empty() {
            warn!(
                bytes = chunks.remainder().len(),
                "Trailing partial record ignored."
            );
        }

        let record_total = body.len() / record_bytes;
        let mut indices = (header.layout == RecordLayout::Indexed)
            .then(|| Vec::with_capacity(record_total));
        let mut values = Vec::with_capacity(record_total);
        for mut record in chunks {
            if let Some(indices) = indices.as_mut() {
                indices.push(record.read_i32::<LittleEndian>()?);
            }
            let mut value = f64::from(record.read_f32::<LittleEndian>()?);
            if header.values_per_record == 2 {
                value += f64::from(record.read_f32::<LittleEndian>()?);
            }
            values.push(value);
        }

        if values.len() != header.record_count as usize {
            warn!(
                declared = header.record_count,
                found = values.len(),
                "Number of records differs from the header; continuing with the found data."
            );
        }
        debug!(records = values.len(), title = %header.title, "Parsed PGRID file.");
        Ok((header, DensityRecords { indices, values }))
    }

    /// Writes single-valued records; the header's record count and values-per-record fields
    /// are set from `records`, and the title is truncated to fit its field.
    pub fn write_to(
        header: &PgridHeader,
        records: &DensityRecords,
        writer: &mut impl Write,
    ) -> Result<(), GridFileError> {
        for v in header.version {
            writer.write_i32::<LittleEndian>(v)?;
        }
        let title = truncate_title(&header.title, MAX_TITLE_BYTES);
        let mut title_raw = [0u8; TITLE_FIELD_BYTES];
        title_raw[..title.len()].copy_from_slice(title.as_bytes());
        writer.write_all(&title_raw)?;

        let layout = if records.indices.is_some() {
            RecordLayout::Indexed
        } else {
            RecordLayout::Raw
        };
        for v in [header.grid_type, layout.code(), 1, CELL_DIMENSIONS] {
            writer.write_i32::<LittleEndian>(v)?;
        }
        for v in header.voxels {
            writer.write_i32::<LittleEndian>(v)?;
        }
        writer.write_i32::<LittleEndian>(records.values.len() as i32)?;
        for v in header.cell {
            writer.write_f32::<LittleEndian>(v)?;
        }

        match &records.indices {
            Some(indices) => {
                let empty = PgridSymmetry {
                    centrosymmetric: 0,
                    centering_operations: 0,
                    operators: Vec::new(),
                    centering_vector: [0; 3],
                };
                let symmetry = header.symmetry.as_ref().unwrap_or(&empty);
                for v in [
                    symmetry.operators.len() as i32,
                    symmetry.centrosymmetric,
                    symmetry.centering_operations,
                ] {
                    writer.write_i32::<LittleEndian>(v)?;
                }
                for v in symmetry.operators.iter().flatten().chain(&symmetry.centering_vector) {
                    writer.write_i32::<LittleEndian>(*v)?;
                }
                for (&index, &value) in indices.iter().zip(&records.values) {
                    writer.write_i32::<LittleEndian>(index)?;
                    writer.write_f32::<LittleEndian>(value as f32)?;
                }
            }
            None => {
                for &value in &records.values {
                    writer.write_f32::<LittleEndian>(value as f32)?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(PgridHeader, DensityRecords), GridFileError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}
