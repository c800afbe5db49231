use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cell of the prediction table.
///
/// The CSV schema is open-ended: beyond the core columns (Symbol, Rate,
/// price targets, Predict) the model may emit an arbitrary number of
/// numeric feature columns, discovered at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

/// One row of the prediction table: a ticker symbol plus its cells keyed
/// by column name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRow {
    pub symbol: String,
    pub cells: HashMap<String, CellValue>,
}

impl ScreeningRow {
    /// Numeric value of a column, `None` when the cell is absent or text.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(CellValue::as_number)
    }
}

/// The loaded prediction table. Immutable after load; filtering produces
/// new tables rather than mutating this one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningTable {
    /// Header order as loaded, used for display projections.
    pub columns: Vec<String>,

    /// Columns where every non-empty cell parsed as a number. Filters are
    /// only offered over these, mirroring the numeric-dtype whitelist the
    /// dashboard computed once per table load.
    pub numeric_columns: Vec<String>,

    pub rows: Vec<ScreeningRow>,
}

impl ScreeningTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_numeric_column(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_as_number() {
        assert_eq!(CellValue::Number(1.5).as_number(), Some(1.5));
        assert_eq!(CellValue::Text("VCB".to_string()).as_number(), None);
    }

    #[test]
    fn test_row_number_lookup() {
        let mut cells = HashMap::new();
        cells.insert("Rate".to_string(), CellValue::Number(2.5));
        cells.insert("Note".to_string(), CellValue::Text("hold".to_string()));
        let row = ScreeningRow {
            symbol: "FPT".to_string(),
            cells,
        };

        assert_eq!(row.number("Rate"), Some(2.5));
        assert_eq!(row.number("Note"), None);
        assert_eq!(row.number("Missing"), None);
    }
}
