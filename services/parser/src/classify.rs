//! Schema Classifier - decides which known shape a raw table has
//!
//! Classification looks at column names only, never at values. Matching is a
//! case-insensitive substring test against small marker lists.

use collector::RawTable;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Year prefixes that identify a wide, year-indexed production table
pub const RECENT_YEARS: &[&str] = &["2013", "2014", "2015", "2016", "2017"];
/// State / union-territory column markers
pub const STATE_MARKERS: &[&str] = &["state", "ut"];
pub const CROP_MARKERS: &[&str] = &["crop"];
pub const PRODUCTION_MARKERS: &[&str] = &["production", "quantity"];
pub const YEAR_MARKERS: &[&str] = &["year"];

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid regex"));

/// Known table shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    /// One row per state, one column per year (`State/UT`, `2013-14 - Production`, ...)
    WideYearIndexed,
    /// One row per record with crop and production columns
    NarrowCropIndexed,
    Unrecognized,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Shape::WideYearIndexed => "wide-year-indexed",
            Shape::NarrowCropIndexed => "narrow-crop-indexed",
            Shape::Unrecognized => "unrecognized",
        };
        f.write_str(tag)
    }
}

/// Case-insensitive substring test of a header against markers
pub fn has_marker(header: &str, markers: &[&str]) -> bool {
    let lower = header.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// First 4-digit token in a header or filename
pub fn year_token(text: &str) -> Option<i32> {
    YEAR_TOKEN.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Classify a table by its headers. Wide is checked before narrow, so a table
/// carrying both patterns is treated as wide.
pub fn classify(table: &RawTable) -> Shape {
    let headers = table.headers();

    let has_year_column = headers
        .iter()
        .any(|h| RECENT_YEARS.iter().any(|y| h.starts_with(y)));
    let has_state_column = headers.iter().any(|h| has_marker(h, STATE_MARKERS));

    if has_year_column && has_state_column {
        return Shape::WideYearIndexed;
    }

    let has_crop_column = headers.iter().any(|h| has_marker(h, CROP_MARKERS));
    let has_production_column = headers.iter().any(|h| has_marker(h, PRODUCTION_MARKERS));

    if has_crop_column && has_production_column {
        return Shape::NarrowCropIndexed;
    }

    Shape::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> RawTable {
        RawTable::new(headers.iter().map(|h| h.to_string()).collect())
    }

    #[test]
    fn test_classify_wide() {
        let t = table(&["Sl. No.", "State/UT", "2013-14 - Production", "2014-15 - Production"]);
        assert_eq!(classify(&t), Shape::WideYearIndexed);
    }

    #[test]
    fn test_classify_narrow() {
        let t = table(&["State_Name", "Crop", "Crop_Year", "Production (Tonnes)"]);
        assert_eq!(classify(&t), Shape::NarrowCropIndexed);
    }

    #[test]
    fn test_classify_narrow_quantity_marker() {
        let t = table(&["CROP NAME", "QUANTITY"]);
        assert_eq!(classify(&t), Shape::NarrowCropIndexed);
    }

    #[test]
    fn test_classify_wide_wins_over_narrow() {
        let t = table(&["State", "Crop", "Production", "2015"]);
        assert_eq!(classify(&t), Shape::WideYearIndexed);
    }

    #[test]
    fn test_classify_old_years_not_wide() {
        // 2010 is outside the recent-year set
        let t = table(&["State", "2010-11"]);
        assert_eq!(classify(&t), Shape::Unrecognized);
    }

    #[test]
    fn test_classify_year_without_state() {
        let t = table(&["Region", "2013"]);
        assert_eq!(classify(&t), Shape::Unrecognized);
    }

    #[test]
    fn test_classify_ignores_values() {
        let t = table(&["name", "value"]);
        assert_eq!(classify(&t), Shape::Unrecognized);
    }

    #[test]
    fn test_year_token() {
        assert_eq!(year_token("2013-14 - Production"), Some(2013));
        assert_eq!(year_token("rs_session240_au1362_1.1.csv"), Some(1362));
        assert_eq!(year_token("Production"), None);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::WideYearIndexed.to_string(), "wide-year-indexed");
        assert_eq!(Shape::Unrecognized.to_string(), "unrecognized");
    }
}
