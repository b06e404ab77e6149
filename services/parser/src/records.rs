//! Canonical record types and the per-row cleaning rules
//!
//! Normalizers produce `StagedRow`s (raw cells under canonical names); the
//! cleaner turns each into a canonical record or drops it.

use collector::Cell;
use serde::Serialize;

/// Textual missing-value marker left behind by stringified nulls
pub const NULL_MARKER: &str = "NAN";
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2025;

/// Agriculture row between normalization and cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    pub state: Cell,
    pub crop: Cell,
    pub production: Cell,
    pub year: Cell,
    pub source_file: Option<String>,
}

/// Climate row between header substitution and cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct StagedClimateRow {
    pub state: Cell,
    pub rainfall: Cell,
    pub year: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgricultureRecord {
    pub state_name: String,
    pub crop_name: String,
    pub production: f64,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateRecord {
    pub state_name: String,
    pub rainfall: f64,
    pub year: i32,
}

/// Upper-cased, trimmed text; `None` when empty or the null marker
pub fn normalize_name(cell: &Cell) -> Option<String> {
    let text = cell.as_text()?.trim().to_uppercase();
    if text.is_empty() || text == NULL_MARKER {
        None
    } else {
        Some(text)
    }
}

fn valid_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

impl AgricultureRecord {
    /// Keep a row only if every field satisfies the record invariants
    pub fn from_staged(row: &StagedRow) -> Option<Self> {
        let state_name = normalize_name(&row.state)?;
        let crop_name = normalize_name(&row.crop)?;
        let production = row.production.as_number().filter(|p| *p > 0.0)?;
        let year = row.year.as_number().map(|y| y as i32).filter(|y| valid_year(*y))?;

        Some(Self {
            state_name,
            crop_name,
            production,
            year,
            source_file: row.source_file.clone(),
        })
    }
}

impl ClimateRecord {
    /// Unparseable year and rainfall fall back to 0; only state and year filter
    pub fn from_staged(row: &StagedClimateRow) -> Option<Self> {
        let state_name = normalize_name(&row.state)?;
        let year = row.year.as_number().unwrap_or(0.0) as i32;
        if !valid_year(year) {
            return None;
        }
        let rainfall = row.rainfall.as_number().unwrap_or(0.0);

        Some(Self {
            state_name,
            rainfall,
            year,
        })
    }
}
