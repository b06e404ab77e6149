//! Wide-to-long reshaper for year-indexed production tables
//!
//! Input looks like:
//!
//! ```text
//! State/UT | 2013-14 - Production | 2014-15 - Production
//! Punjab   | 11267                | 11107
//! ```
//!
//! and becomes one staged row per (source row, year column) with data.

use crate::classify::{has_marker, year_token, CROP_MARKERS, STATE_MARKERS};
use crate::records::StagedRow;
use collector::{Cell, RawTable};
use tracing::{debug, info};

/// Constant crop name for files that carry no crop column
pub fn crop_from_filename(filename: &str) -> String {
    format!("CROP_FROM_{}", filename)
}

/// Melt every year column into long-form rows. Returns nothing when the
/// table has no year columns.
pub fn wide_to_long(table: &RawTable, filename: &str) -> Vec<StagedRow> {
    let headers = table.headers();
    let state_col = headers.iter().position(|h| has_marker(h, STATE_MARKERS));
    let crop_col = headers.iter().position(|h| has_marker(h, CROP_MARKERS));

    let year_cols: Vec<(usize, i32)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != state_col && Some(*idx) != crop_col)
        .filter_map(|(idx, h)| year_token(h).map(|year| (idx, year)))
        .collect();

    debug!(?state_col, ?crop_col, ?year_cols, "wide table columns");

    if year_cols.is_empty() {
        info!(filename, "no year columns found, nothing to reshape");
        return Vec::new();
    }

    let synthesized_crop = Cell::Text(crop_from_filename(filename));
    let mut rows = Vec::with_capacity(year_cols.len() * table.len());

    for (col, year) in &year_cols {
        for row in table.rows() {
            let value = &row[*col];
            if value.is_empty() {
                continue;
            }

            rows.push(StagedRow {
                state: state_col.map(|c| row[c].clone()).unwrap_or(Cell::Empty),
                crop: crop_col
                    .map(|c| row[c].clone())
                    .unwrap_or_else(|| synthesized_crop.clone()),
                production: value.clone(),
                year: Cell::Number(*year as f64),
                source_file: Some(filename.to_string()),
            });
        }
    }

    info!(
        filename,
        year_columns = year_cols.len(),
        rows = rows.len(),
        "converted to long format"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn wide_table() -> RawTable {
        let mut t = RawTable::new(vec![
            "State".to_string(),
            "2013-Production".to_string(),
            "2014-Production".to_string(),
        ]);
        t.push_row(vec![text("Punjab"), Cell::Number(100.0), Cell::Number(250.5)]);
        t
    }

    #[test]
    fn test_one_row_two_year_columns() {
        let rows = wide_to_long(&wide_table(), "punjab.csv");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, text("Punjab"));
        assert_eq!(rows[0].year, Cell::Number(2013.0));
        assert_eq!(rows[0].production, Cell::Number(100.0));
        assert_eq!(rows[1].state, text("Punjab"));
        assert_eq!(rows[1].year, Cell::Number(2014.0));
        assert_eq!(rows[1].production, Cell::Number(250.5));
    }

    #[test]
    fn test_synthesized_crop_from_filename() {
        let rows = wide_to_long(&wide_table(), "RS_Session_258_AU_1212_1.csv");
        assert_eq!(rows[0].crop, text("CROP_FROM_RS_Session_258_AU_1212_1.csv"));
        assert_eq!(rows[0].source_file.as_deref(), Some("RS_Session_258_AU_1212_1.csv"));
    }

    #[test]
    fn test_crop_column_used_when_present() {
        let mut t = RawTable::new(vec![
            "State/UT".to_string(),
            "Crop".to_string(),
            "2015-16".to_string(),
        ]);
        t.push_row(vec![text("Bihar"), text("Maize"), Cell::Number(7.0)]);

        let rows = wide_to_long(&t, "f.csv");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].crop, text("Maize"));
        assert_eq!(rows[0].year, Cell::Number(2015.0));
    }

    #[test]
    fn test_empty_cells_produce_no_rows() {
        let mut t = wide_table();
        t.push_row(vec![text("Kerala"), Cell::Empty, Cell::Number(3.0)]);

        let rows = wide_to_long(&t, "f.csv");
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.production.is_empty()));
    }

    #[test]
    fn test_no_year_columns_is_empty() {
        let mut t = RawTable::new(vec!["State".to_string(), "Production".to_string()]);
        t.push_row(vec![text("Goa"), Cell::Number(1.0)]);
        assert!(wide_to_long(&t, "f.csv").is_empty());
    }

    #[test]
    fn test_missing_state_column_leaves_state_empty() {
        let mut t = RawTable::new(vec!["Region".to_string(), "2016".to_string()]);
        t.push_row(vec![text("North"), Cell::Number(9.0)]);

        let rows = wide_to_long(&t, "f.csv");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].state.is_empty());
    }
}
