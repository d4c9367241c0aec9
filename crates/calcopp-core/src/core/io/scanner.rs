use super::error::{FormatErrorKind, GridFileError};
use crate::core::models::grid::point_count;
use std::collections::VecDeque;
use std::io::{self, BufRead};

/// Upper bound on capacity reserved from a count declared in a file header; larger blocks
/// grow as their values arrive.
const MAX_RESERVED_VALUES: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub line: usize,
    pub text: String,
    /// Whether this is the first token of its line.
    pub leading: bool,
}

/// Single-pass line and token reader over a text grid.
///
/// Section markers are located by scanning forward only; the reader is never rewound.
pub(crate) struct Tokenizer<R> {
    reader: R,
    line_number: usize,
    current_line: String,
    pending: VecDeque<(String, bool)>,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            current_line: String::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn current_line(&self) -> &str {
        &self.current_line
    }

    fn fill_line(&mut self) -> io::Result<bool> {
        self.pending.clear();
        self.current_line.clear();
        if self.reader.read_line(&mut self.current_line)? == 0 {
            return Ok(false);
        }
        while self.current_line.ends_with(['\n', '\r']) {
            self.current_line.pop();
        }
        self.line_number += 1;
        Ok(true)
    }

    /// Reads the next raw line, dropping unread tokens of the current one.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.fill_line()?.then(|| self.current_line.clone()))
    }

    pub fn next_nonblank_line(&mut self) -> io::Result<Option<String>> {
        while self.fill_line()? {
            if !self.current_line.trim().is_empty() {
                return Ok(Some(self.current_line.clone()));
            }
        }
        Ok(None)
    }

    pub fn remaining_lines(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Advances to the first line whose leading token equals `marker` and queues the rest of
    /// that line. Every line passed over is handed to `skipped`.
    pub fn seek_marker(&mut self, marker: &str, mut skipped: impl FnMut(&str)) -> io::Result<bool> {
        while self.fill_line()? {
            let mut tokens = self.current_line.split_whitespace();
            if tokens.next() == Some(marker) {
                self.pending = tokens.map(|t| (t.to_string(), false)).collect();
                return Ok(true);
            }
            skipped(&self.current_line);
        }
        Ok(false)
    }

    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        loop {
            if let Some((text, leading)) = self.pending.pop_front() {
                return Ok(Some(Token {
                    line: self.line_number,
                    text,
                    leading,
                }));
            }
            if !self.fill_line()? {
                return Ok(None);
            }
            self.pending = self
                .current_line
                .split_whitespace()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i == 0))
                .collect();
        }
    }

    pub fn discard_rest_of_line(&mut self) {
        self.pending.clear();
    }

    /// Reads exactly `count` positive integers.
    pub fn take_counts(
        &mut self,
        count: usize,
        section: &'static str,
    ) -> Result<Vec<usize>, GridFileError> {
        let mut counts = Vec::with_capacity(count.min(MAX_RESERVED_VALUES));
        while counts.len() < count {
            let token = self.next_token()?.ok_or_else(|| self.truncated(section, count, counts.len()))?;
            match token.text.parse::<usize>() {
                Ok(n) if n > 0 => counts.push(n),
                _ => {
                    return Err(GridFileError::Format {
                        line: token.line,
                        kind: FormatErrorKind::InvalidCount {
                            section,
                            value: token.text,
                        },
                    });
                }
            }
        }
        Ok(counts)
    }

    /// Reads exactly `count` real numbers.
    pub fn take_reals(
        &mut self,
        count: usize,
        section: &'static str,
    ) -> Result<Vec<f64>, GridFileError> {
        let mut values = value_buffer(count);
        while values.len() < count {
            let token = self.next_token()?.ok_or_else(|| self.truncated(section, count, values.len()))?;
            values.push(parse_real(&token, section)?);
        }
        Ok(values)
    }

    /// Number of points of a grid of `shape` declared in `section`.
    pub fn point_count(
        &self,
        shape: &[usize],
        section: &'static str,
    ) -> Result<usize, GridFileError> {
        point_count(shape).ok_or_else(|| GridFileError::Format {
            line: self.line_number,
            kind: FormatErrorKind::TooManyPoints {
                section,
                shape: shape.to_vec(),
            },
        })
    }

    fn truncated(&self, section: &'static str, expected: usize, found: usize) -> GridFileError {
        GridFileError::Format {
            line: self.line_number,
            kind: FormatErrorKind::Truncated {
                section,
                expected,
                found,
            },
        }
    }
}

/// An empty buffer for `count` values, reserving at most a bounded amount up front.
pub(crate) fn value_buffer(count: usize) -> Vec<f64> {
    Vec::with_capacity(count.min(MAX_RESERVED_VALUES))
}

pub(crate) fn parse_real(token: &Token, section: &'static str) -> Result<f64, GridFileError> {
    token.text.parse::<f64>().map_err(|_| GridFileError::Format {
        line: token.line,
        kind: FormatErrorKind::InvalidReal {
            section,
            value: token.text.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokenizer(text: &str) -> Tokenizer<Cursor<&[u8]>> {
        Tokenizer::new(Cursor::new(text.as_bytes()))
    }

    #[test]
    fn seek_marker_reports_skipped_lines_and_queues_rest_of_marker_line() {
        let mut t = tokenizer("title\nnotes here\nDIMENSIONS 3 4\n");
        let mut skipped = Vec::new();
        assert!(t.seek_marker("DIMENSIONS", |l| skipped.push(l.to_string())).unwrap());
        assert_eq!(skipped, vec!["title", "notes here"]);
        assert_eq!(t.take_counts(2, "dimensions").unwrap(), vec![3, 4]);
    }

    #[test]
    fn seek_marker_is_case_sensitive() {
        let mut t = tokenizer("dimensions 3 4\n");
        assert!(!t.seek_marker("DIMENSIONS", |_| {}).unwrap());
    }

    #[test]
    fn take_reals_continues_across_lines() {
        let mut t = tokenizer("1.0 2.0\n\n3e0\n  -4.5  \n");
        assert_eq!(t.take_reals(4, "data").unwrap(), vec![1.0, 2.0, 3.0, -4.5]);
    }

    #[test]
    fn take_reals_reports_truncation_with_counts() {
        let mut t = tokenizer("1.0 2.0\n");
        let err = t.take_reals(3, "data").unwrap_err();
        match err {
            GridFileError::Format { line, kind } => {
                assert_eq!(line, 1);
                assert_eq!(
                    kind,
                    FormatErrorKind::Truncated {
                        section: "data",
                        expected: 3,
                        found: 2
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn huge_declared_counts_fail_on_missing_values_without_reserving_them() {
        let mut t = tokenizer("1 2 3\n");
        assert!(matches!(
            t.take_reals(10_000_000_000, "data"),
            Err(GridFileError::Format {
                kind: FormatErrorKind::Truncated { found: 3, .. },
                ..
            })
        ));
        assert!(value_buffer(usize::MAX).capacity() < 2 * MAX_RESERVED_VALUES);
    }

    #[test]
    fn overflowing_point_count_is_a_format_error() {
        let t = tokenizer("");
        assert!(matches!(
            t.point_count(&[1 << 32, 1 << 32, 2], "dimensions"),
            Err(GridFileError::Format {
                kind: FormatErrorKind::TooManyPoints { section: "dimensions", .. },
                ..
            })
        ));
        assert_eq!(t.point_count(&[3, 4], "dimensions").unwrap(), 12);
    }

    #[test]
    fn take_counts_rejects_zero_and_non_integers() {
        assert!(matches!(
            tokenizer("0 3").take_counts(2, "dimensions"),
            Err(GridFileError::Format {
                kind: FormatErrorKind::InvalidCount { .. },
                ..
            })
        ));
        assert!(matches!(
            tokenizer("2.5 3").take_counts(2, "dimensions"),
            Err(GridFileError::Format { .. })
        ));
    }

    #[test]
    fn tokens_know_whether_they_lead_their_line() {
        let mut t = tokenizer("a b\nc\n");
        let leading: Vec<bool> = std::iter::from_fn(|| t.next_token().unwrap())
            .map(|tok| tok.leading)
            .collect();
        assert_eq!(leading, vec![true, false, true]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let mut t = tokenizer("first\r\nsecond\r\n");
        assert_eq!(t.next_line().unwrap().as_deref(), Some("first"));
        assert_eq!(t.next_line().unwrap().as_deref(), Some("second"));
        assert_eq!(t.next_line().unwrap(), None);
    }
}
