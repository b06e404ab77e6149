//! Climate header substitution
//!
//! Rainfall files are structurally simple, so instead of shape detection a
//! literal table maps every known header spelling onto a canonical column.

use crate::records::StagedClimateRow;
use collector::{Cell, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateColumn {
    StateName,
    Rainfall,
    Year,
}

/// Known header spellings, matched exactly
pub const HEADER_SUBSTITUTIONS: &[(&str, ClimateColumn)] = &[
    // State / district / subdivision names
    ("state_name", ClimateColumn::StateName),
    ("state", ClimateColumn::StateName),
    ("State", ClimateColumn::StateName),
    ("district_name", ClimateColumn::StateName),
    ("district", ClimateColumn::StateName),
    ("District", ClimateColumn::StateName),
    ("subdivision", ClimateColumn::StateName),
    ("sub_division", ClimateColumn::StateName),
    ("Dist_Name", ClimateColumn::StateName),
    ("dist_name", ClimateColumn::StateName),
    ("ST_Name", ClimateColumn::StateName),
    ("st_name", ClimateColumn::StateName),
    ("State_Name", ClimateColumn::StateName),
    // Rainfall
    ("annual", ClimateColumn::Rainfall),
    ("rainfall", ClimateColumn::Rainfall),
    ("Rainfall", ClimateColumn::Rainfall),
    ("annual_rainfall", ClimateColumn::Rainfall),
    ("annual_average_rainfall_mm", ClimateColumn::Rainfall),
    ("rain_mm", ClimateColumn::Rainfall),
    ("ANNUAL_RAIN", ClimateColumn::Rainfall),
    ("Annual", ClimateColumn::Rainfall),
    ("ANNUAL", ClimateColumn::Rainfall),
    // Year
    ("year_code", ClimateColumn::Year),
    ("rain_year", ClimateColumn::Year),
    ("year", ClimateColumn::Year),
    ("Year", ClimateColumn::Year),
    ("YR", ClimateColumn::Year),
    ("Yr", ClimateColumn::Year),
    ("YEAR", ClimateColumn::Year),
];

pub fn substitute(header: &str) -> Option<ClimateColumn> {
    HEADER_SUBSTITUTIONS
        .iter()
        .find(|(spelling, _)| *spelling == header)
        .map(|(_, column)| *column)
}

/// Rename a raw climate table onto the canonical columns. The first header
/// per column wins; columns that never appear stay empty.
pub fn stage_climate(table: &RawTable) -> Vec<StagedClimateRow> {
    let mut state = None;
    let mut rainfall = None;
    let mut year = None;

    for (idx, header) in table.headers().iter().enumerate() {
        let slot = match substitute(header) {
            Some(ClimateColumn::StateName) => &mut state,
            Some(ClimateColumn::Rainfall) => &mut rainfall,
            Some(ClimateColumn::Year) => &mut year,
            None => continue,
        };
        slot.get_or_insert(idx);
    }

    let pick = |row: &[Cell], col: Option<usize>| col.map(|c| row[c].clone()).unwrap_or(Cell::Empty);

    table
        .rows()
        .iter()
        .map(|row| StagedClimateRow {
            state: pick(row, state),
            rainfall: pick(row, rainfall),
            year: pick(row, year),
        })
        .collect()
}
