use std::io::{self, Write};

const COLUMN_WIDTH: usize = 18;

/// A column of the plain-text output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: &'static str,
    pub unit: &'static str,
}

impl TableColumn {
    pub const fn new(name: &'static str, unit: &'static str) -> Self {
        Self { name, unit }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

/// Writes whitespace-separated columns with a `#`-prefixed header, one row per grid point.
///
/// Rows are written as they are produced, so no full-size table is held in memory.
pub struct TableWriter<W: Write> {
    writer: W,
    columns: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(mut writer: W, comments: &[String], columns: &[TableColumn]) -> io::Result<Self> {
        for comment in comments {
            writeln!(writer, "# {}", comment)?;
        }
        write!(writer, "#")?;
        for (i, column) in columns.iter().enumerate() {
            let width = if i == 0 { COLUMN_WIDTH - 1 } else { COLUMN_WIDTH };
            write!(writer, "{:>width$}", column.label(), width = width)?;
        }
        writeln!(writer)?;
        Ok(Self {
            writer,
            columns: columns.len(),
        })
    }

    pub fn write_row(&mut self, values: &[f64]) -> io::Result<()> {
        debug_assert_eq!(values.len(), self.columns);
        for value in values {
            write!(self.writer, "{:>width$.8e}", value, width = COLUMN_WIDTH)?;
        }
        writeln!(self.writer)
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lists_comments_and_column_labels_with_units() {
        let columns = [TableColumn::new("x", "Å"), TableColumn::new("OPP", "eV")];
        let table = TableWriter::new(Vec::new(), &["source: test".to_string()], &columns).unwrap();
        let text = String::from_utf8(table.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# source: test");
        assert!(lines[1].starts_with('#'));
        assert!(lines[1].contains("x (Å)"));
        assert!(lines[1].contains("OPP (eV)"));
    }

    #[test]
    fn rows_parse_back_to_the_written_values() {
        let columns = [TableColumn::new("a", "1"), TableColumn::new("b", "1")];
        let mut table = TableWriter::new(Vec::new(), &[], &columns).unwrap();
        table.write_row(&[0.5, -1.0e6]).unwrap();
        table.write_row(&[1.25, 3.0e-7]).unwrap();
        let text = String::from_utf8(table.finish().unwrap()).unwrap();

        let rows: Vec<Vec<f64>> = text
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(|l| l.split_whitespace().map(|t| t.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows, vec![vec![0.5, -1.0e6], vec![1.25, 3.0e-7]]);
    }
}
