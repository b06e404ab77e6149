//! Raw Table - the untyped rectangular table every loader produces
//!
//! A `RawTable` knows nothing about agriculture or rainfall. It carries the
//! headers exactly as the source spelled them and one `Cell` per field.
//! Shape detection and typing happen later, in the parser.

use serde_json::Value;
use std::fmt;

/// Values read as missing, the same set a pandas reader treats as NA
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single field of a raw table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Type a delimited-text field: NA markers become `Empty`, numbers `Number`
    pub fn from_field(field: &str) -> Self {
        let trimmed = field.trim();
        if NA_MARKERS.contains(&trimmed) {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Type a JSON value from a remote `records` payload.
    /// Strings stay text (the API sends numbers as strings); coercion is the
    /// cleaner's job.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::String(s) => Cell::Text(s.clone()),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    /// Text rendering, `None` for empty cells
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Numeric coercion: unparseable text is `None`, never an error
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Rectangular table: every row has exactly `headers.len()` cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with `Empty` and truncating long ones
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Build a table from a JSON `records` array of row objects.
    /// Headers are the union of keys in first-seen order.
    pub fn from_records(records: &[Value]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            if let Value::Object(map) = record {
                for key in map.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
            }
        }

        let mut table = RawTable::new(headers);
        for record in records {
            let Value::Object(map) = record else {
                continue;
            };
            let row = table
                .headers
                .iter()
                .map(|h| map.get(h).map(Cell::from_json).unwrap_or(Cell::Empty))
                .collect();
            table.rows.push(row);
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// A column is numeric-typed when every non-empty cell is a number
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        idx < self.headers.len() && self.column(idx).all(|c| c.is_empty() || c.is_number())
    }

    /// Serialize as CSV with a header row
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_from_field_typing() {
        assert_eq!(Cell::from_field("  12.5 "), Cell::Number(12.5));
        assert_eq!(Cell::from_field("Punjab"), Cell::Text("Punjab".to_string()));
        assert_eq!(Cell::from_field(""), Cell::Empty);
        assert_eq!(Cell::from_field("NA"), Cell::Empty);
        assert_eq!(Cell::from_field("nan"), Cell::Empty);
    }

    #[test]
    fn test_cell_number_coercion() {
        assert_eq!(Cell::Text(" 42 ".into()).as_number(), Some(42.0));
        assert_eq!(Cell::Text("1,234".into()).as_number(), None);
        assert_eq!(Cell::Text("inf".into()).as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = RawTable::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(vec![Cell::Number(1.0)]);
        assert_eq!(table.rows()[0].len(), 3);
        assert!(table.rows()[0][2].is_empty());
    }

    #[test]
    fn test_from_records_unions_keys() {
        let records = vec![
            json!({"state_name": "Kerala", "annual": "3055.2"}),
            json!({"state_name": "Goa", "year": 2001}),
        ];
        let table = RawTable::from_records(&records);

        // keys arrive sorted within each record
        assert_eq!(table.headers(), &["annual", "state_name", "year"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][0], Cell::Empty);
        assert_eq!(table.rows()[1][2], Cell::Number(2001.0));
    }

    #[test]
    fn test_numeric_column_detection() {
        let mut table = RawTable::new(vec!["name".into(), "value".into()]);
        table.push_row(vec![Cell::Text("x".into()), Cell::Number(1.0)]);
        table.push_row(vec![Cell::Text("y".into()), Cell::Empty]);

        assert!(!table.is_numeric_column(0));
        assert!(table.is_numeric_column(1));
        assert!(!table.is_numeric_column(5));
    }

    #[test]
    fn test_write_csv() {
        let mut table = RawTable::new(vec!["State".into(), "2013".into()]);
        table.push_row(vec![Cell::Text("Goa".into()), Cell::Number(10.5)]);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "State,2013\nGoa,10.5\n");
    }
}
