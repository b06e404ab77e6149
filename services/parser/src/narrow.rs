//! Narrow-table mapper: one source row becomes one staged row
//!
//! Used for crop-indexed tables and, as a best effort, for tables no rule
//! recognized. Missing canonical columns are synthesized.

use crate::classify::{
    has_marker, year_token, CROP_MARKERS, PRODUCTION_MARKERS, STATE_MARKERS, YEAR_MARKERS,
};
use crate::records::StagedRow;
use crate::reshape::crop_from_filename;
use collector::{Cell, RawTable};
use tracing::debug;

/// Sentinel state for tables without any state column
pub const UNKNOWN_STATE: &str = "UNKNOWN_STATE";
/// Year used when neither a column nor the filename carries one
pub const DEFAULT_YEAR: i32 = 2015;
/// Column names that hold crop values when no `crop` column exists
const CROP_KEYWORDS: &[&str] = &["wheat", "rice", "maize", "pulse"];

/// Source column index chosen for each canonical field
#[derive(Debug, Default, PartialEq)]
pub struct ColumnMapping {
    pub state: Option<usize>,
    pub crop: Option<usize>,
    pub production: Option<usize>,
    pub year: Option<usize>,
}

impl ColumnMapping {
    /// Each header goes to the first rule it matches (state, crop, production,
    /// year); the first header per field wins.
    pub fn detect(headers: &[String]) -> Self {
        let mut mapping = ColumnMapping::default();

        for (idx, header) in headers.iter().enumerate() {
            let slot = if has_marker(header, STATE_MARKERS) {
                &mut mapping.state
            } else if has_marker(header, CROP_MARKERS) {
                &mut mapping.crop
            } else if has_marker(header, PRODUCTION_MARKERS) {
                &mut mapping.production
            } else if has_marker(header, YEAR_MARKERS) {
                &mut mapping.year
            } else {
                continue;
            };

            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        mapping
    }

    /// Whether a source column already feeds a canonical field
    pub fn is_mapped(&self, idx: usize) -> bool {
        [self.state, self.crop, self.production, self.year].contains(&Some(idx))
    }
}

/// Map a narrow table onto the canonical columns
pub fn map_narrow(table: &RawTable, filename: &str) -> Vec<StagedRow> {
    let headers = table.headers();
    let mapping = ColumnMapping::detect(headers);

    let crop_keyword_col = headers
        .iter()
        .enumerate()
        .position(|(idx, h)| !mapping.is_mapped(idx) && has_marker(h, CROP_KEYWORDS));
    let numeric_col = (0..headers.len()).find(|idx| table.is_numeric_column(*idx));
    let fallback_year = year_token(filename).unwrap_or(DEFAULT_YEAR);

    debug!(?mapping, ?crop_keyword_col, ?numeric_col, fallback_year, "narrow column mapping");

    let crop_constant = Cell::Text(crop_from_filename(filename));

    table
        .rows()
        .iter()
        .map(|row| {
            let state = match mapping.state {
                Some(c) => row[c].clone(),
                None => Cell::Text(UNKNOWN_STATE.to_string()),
            };

            let crop = match (mapping.crop, crop_keyword_col) {
                (Some(c), _) => row[c].clone(),
                (None, Some(c)) => row[c].as_text().map(Cell::Text).unwrap_or(Cell::Empty),
                (None, None) => crop_constant.clone(),
            };

            let production = match (mapping.production, numeric_col) {
                (Some(c), _) | (None, Some(c)) => row[c].clone(),
                (None, None) => Cell::Number(0.0),
            };

            let year = match mapping.year {
                Some(c) => row[c].clone(),
                None => Cell::Number(fallback_year as f64),
            };

            StagedRow {
                state,
                crop,
                production,
                year,
                source_file: None,
            }
        })
        .collect()
}
