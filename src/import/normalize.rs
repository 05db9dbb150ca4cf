//! CSV normalization
//!
//! Turns uploaded bytes into a clean column list plus a lazy row iterator.
//! Spreadsheet exports tend to carry invisible characters (BOMs, zero-width
//! spaces, bidi marks) and stray spaces before delimiters in the header;
//! both are removed here so that column matching sees the visible names.

use csv::{ReaderBuilder, StringRecordsIntoIter};
use regex::Regex;
use std::sync::OnceLock;

use super::error::ValidationError;

/// Required file name suffix for uploads
pub const CSV_EXTENSION: &str = ".csv";

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{Cc}\p{Cf}]").expect("valid control character class"))
}

fn space_before_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+,").expect("valid header spacing pattern"))
}

/// Fail unless the file name carries the `.csv` extension
pub fn check_extension(file_name: &str) -> Result<(), ValidationError> {
    if file_name.ends_with(CSV_EXTENSION) {
        Ok(())
    } else {
        Err(ValidationError::WrongExtension(file_name.to_string()))
    }
}

/// Remove Unicode control (Cc) and format (Cf) characters
pub fn strip_control_chars(s: &str) -> String {
    control_chars().replace_all(s, "").into_owned()
}

/// Remove whitespace immediately preceding a comma in the header line only
pub fn fix_header_spacing(content: &str) -> String {
    let header_end = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
    let (header, body) = content.split_at(header_end);

    // The line terminator is whitespace too; keep it out of the match
    let (line, terminator) = match header.strip_suffix("\r\n") {
        Some(line) => (line, "\r\n"),
        None => match header.strip_suffix('\n') {
            Some(line) => (line, "\n"),
            None => (header, ""),
        },
    };

    let mut out = String::with_capacity(content.len());
    out.push_str(&space_before_comma().replace_all(line, ","));
    out.push_str(terminator);
    out.push_str(body);
    out
}

/// A parsed, normalized CSV file
#[derive(Debug, Clone)]
pub struct CsvDocument {
    columns: Vec<String>,
    /// Record index of each named column
    positions: Vec<usize>,
    content: String,
}

impl CsvDocument {
    /// Validate an upload: extension first, then content
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> Result<Self, ValidationError> {
        check_extension(file_name)?;
        Self::parse(bytes)
    }

    /// Parse raw bytes, normalizing the header and checking every record
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ValidationError::Parse(format!("not valid UTF-8: {}", e)))?;
        let content = fix_header_spacing(text);

        let headers: Vec<String> = {
            let mut rdr = reader(&content);
            let headers = rdr
                .headers()
                .map_err(|e| ValidationError::Parse(e.to_string()))?;
            headers
                .iter()
                .map(|h| strip_control_chars(h).trim().to_string())
                .collect()
        };

        // Blank header cells (trailing delimiters in spreadsheet exports)
        // name no column and are dropped along with their cells
        let mut columns = Vec::with_capacity(headers.len());
        let mut positions = Vec::with_capacity(headers.len());
        for (idx, column) in headers.into_iter().enumerate() {
            if column.is_empty() {
                continue;
            }
            if columns.contains(&column) {
                return Err(ValidationError::DuplicateColumn(column));
            }
            columns.push(column);
            positions.push(idx);
        }
        if columns.is_empty() {
            return Err(ValidationError::Parse("missing header line".to_string()));
        }

        let doc = Self {
            columns,
            positions,
            content,
        };
        for row in doc.rows() {
            row?;
        }
        log::debug!(
            "parsed CSV with {} columns: {:?}",
            doc.columns.len(),
            doc.columns
        );
        Ok(doc)
    }

    /// Normalized column names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Lazily iterate the data rows
    pub fn rows(&self) -> CsvRows<'_> {
        CsvRows {
            records: reader(&self.content).into_records(),
            columns: &self.columns,
            positions: &self.positions,
            line: 0,
        }
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows().count()
    }
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes())
}

/// One data row: `(column, raw value)` pairs in column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based data row number (the header is not counted)
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

/// Iterator over the rows of a [`CsvDocument`]
pub struct CsvRows<'a> {
    records: StringRecordsIntoIter<&'a [u8]>,
    columns: &'a [String],
    positions: &'a [usize],
    line: usize,
}

impl Iterator for CsvRows<'_> {
    type Item = Result<CsvRow, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.line += 1;
        let line = self.line;

        Some(
            record
                .map_err(|e| ValidationError::Parse(format!("row {}: {}", line, e)))
                .map(|record| CsvRow {
                    line,
                    // Short rows read as empty cells; surplus cells are ignored
                    fields: self
                        .columns
                        .iter()
                        .zip(self.positions)
                        .map(|(c, &i)| (c.clone(), record.get(i).unwrap_or("").to_string()))
                        .collect(),
                }),
        )
    }
}
