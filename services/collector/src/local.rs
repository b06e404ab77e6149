//! Local Loader - reads CSV/XLS files from disk into a `RawTable`
//!
//! Every failure mode (missing file, unknown extension, parse error) is a
//! `LoadError`; `load_or_empty` collapses them into an empty table so the
//! pipeline can treat them all the same way.

use crate::table::{Cell, RawTable};
use calamine::{open_workbook_auto, Data, Reader};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file not found: {0}")]
    Missing(PathBuf),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("workbook has no sheets: {0}")]
    NoSheets(PathBuf),
}

/// Recognized on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "xls" | "xlsx" => Some(FileFormat::Excel),
            _ => None,
        }
    }
}

/// Load a tabular file, reporting why it could not be read
pub fn load_local_file(path: &Path) -> Result<RawTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }

    let format =
        FileFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    let table = match format {
        FileFormat::Csv => {
            let bytes = std::fs::read(path)?;
            parse_csv(&decode_text(&bytes))?
        }
        FileFormat::Excel => read_first_sheet(path)?,
    };

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = ?table.headers(),
        "loaded local file"
    );
    Ok(table)
}

/// Load a tabular file; any failure yields an empty table
pub fn load_or_empty(path: &Path) -> RawTable {
    match load_local_file(path) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load file");
            RawTable::empty()
        }
    }
}

/// Decode file bytes: UTF-8 (BOM stripped) first, Windows-1252 otherwise.
/// Windows-1252 is a superset of Latin-1 for every printable byte, so it
/// stands in for both of those fallbacks.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("content is not UTF-8, decoding as windows-1252");
            encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0
        }
    }
}

/// Parse comma-separated text. Lines with more fields than the header are
/// skipped; short lines are padded with empty cells.
pub fn parse_csv(content: &str) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = normalize_headers(reader.headers()?.iter().map(|h| h.to_string()));
    let width = headers.len();
    let mut table = RawTable::new(headers);
    let mut skipped = 0;

    for (line_idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping line {}: {}", line_idx + 2, e);
                skipped += 1;
                continue;
            }
        };

        if record.len() > width {
            skipped += 1;
            continue;
        }

        table.push_row(record.iter().map(Cell::from_field).collect());
    }

    if skipped > 0 {
        warn!("skipped {} malformed CSV line(s)", skipped);
    }

    Ok(table)
}

/// Read the first worksheet; the first row is the header
fn read_first_sheet(path: &Path) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| LoadError::NoSheets(path.to_path_buf()))?;

    let range = workbook.worksheet_range(sheet_name)?;
    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        return Ok(RawTable::empty());
    };

    let headers = normalize_headers(header_row.iter().map(|cell| match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => format!("{}", other),
    }));

    let mut table = RawTable::new(headers);
    for row in rows {
        table.push_row(row.iter().map(excel_cell).collect());
    }

    Ok(table)
}

fn excel_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from_field(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(format!("{}", other)),
    }
}

/// Blank headers become `Unnamed: <idx>` so every column stays addressable
fn normalize_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    headers
        .enumerate()
        .map(|(idx, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                h
            }
        })
        .collect()
}
