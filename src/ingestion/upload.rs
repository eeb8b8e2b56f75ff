use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use crate::models::{RawTable, RawValue};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file format. Please upload a CSV or Excel file.")]
    UnsupportedFormat,

    #[error("could not parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {line} has {found} fields but the header has {expected}")]
    RowTooWide {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("could not read Excel workbook: {0}")]
    Excel(#[from] calamine::Error),
}

/// File kinds accepted at the upload boundary, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Csv,
    Excel,
}

impl UploadKind {
    pub fn from_filename(name: &str) -> Result<Self, UploadError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(UploadKind::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Ok(UploadKind::Excel)
        } else {
            Err(UploadError::UnsupportedFormat)
        }
    }
}

/// Decode an uploaded file into a raw table.
pub fn parse_upload(filename: &str, bytes: &[u8]) -> Result<RawTable, UploadError> {
    match UploadKind::from_filename(filename)? {
        UploadKind::Csv => parse_csv(bytes),
        UploadKind::Excel => parse_excel(bytes),
    }
}

/// Parse CSV with a header row. Each cell is typed on its own; short rows
/// are padded with missing values, rows wider than the header are rejected.
pub fn parse_csv(bytes: &[u8]) -> Result<RawTable, UploadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();
    let mut table = RawTable::new(headers);

    for result in rdr.records() {
        let record = result?;
        if record.len() > width {
            return Err(UploadError::RowTooWide {
                line: record.position().map_or(0, |p| p.line()),
                expected: width,
                found: record.len(),
            });
        }
        table.push_row(record.iter().map(RawValue::infer).collect());
    }

    tracing::debug!(
        rows = table.len(),
        columns = table.columns().len(),
        "CSV upload parsed"
    );

    Ok(table)
}

/// Read the first worksheet of an `.xlsx`/`.xls` workbook. The first row is
/// the header.
pub fn parse_excel(bytes: &[u8]) -> Result<RawTable, UploadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(RawTable::default());
    };
    let range = range?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };

    let mut table = RawTable::new(header.iter().map(|cell| cell.to_string()).collect());
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }

    tracing::debug!(
        rows = table.len(),
        columns = table.columns().len(),
        "Excel upload parsed"
    );

    Ok(table)
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Float(f) => RawValue::Number(*f),
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::String(s) if s.is_empty() => RawValue::Missing,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Bool(b) => RawValue::Text(if *b { "True" } else { "False" }.into()),
        Data::Empty | Data::Error(_) => RawValue::Missing,
        other => RawValue::Text(other.to_string()),
    }
}
