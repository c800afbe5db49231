//! Declarative filter-and-sort pipeline over the prediction table.
//!
//! Every stage is a pure function of its inputs: filtering never mutates
//! the source table, sorting is stable, projection drops columns the
//! table does not have. The pipeline recomputes from the immutable loaded
//! snapshot on every request.

use crate::error::{AppError, Result};
use crate::models::{ScreeningRow, ScreeningTable};
use std::collections::BTreeMap;

/// Inclusive numeric range for one column. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min > max {
            return Err(AppError::InvalidInput(format!(
                "range min {} exceeds max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-column range constraints. An empty spec passes every row through.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    ranges: BTreeMap<String, RangeFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, column: impl Into<String>, range: RangeFilter) -> Self {
        self.ranges.insert(column.into(), range);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, range: RangeFilter) {
        self.ranges.insert(column.into(), range);
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &BTreeMap<String, RangeFilter> {
        &self.ranges
    }

    /// Parse a repeatable `NAME:MIN:MAX` argument. Column names may
    /// themselves contain colons-free spaces ("Pivot Price (Buy)"), so
    /// the split takes the last two fields as the bounds.
    pub fn parse_arg(&mut self, arg: &str) -> Result<()> {
        let parts: Vec<&str> = arg.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(AppError::InvalidInput(format!(
                "filter must be NAME:MIN:MAX, got '{}'",
                arg
            )));
        }
        let column = parts[2];
        let min: f64 = parts[1]
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("invalid filter min '{}'", parts[1])))?;
        let max: f64 = parts[0]
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("invalid filter max '{}'", parts[0])))?;
        self.insert(column, RangeFilter::new(min, max)?);
        Ok(())
    }
}

/// A full screening request: range constraints, an optional descending
/// sort column, and the display projection.
#[derive(Debug, Clone, Default)]
pub struct ScreenRequest {
    pub spec: FilterSpec,
    pub sort_by: Option<String>,
    pub columns: Vec<String>,
}

/// A row passes iff every constrained column holds a numeric value inside
/// its inclusive range. A missing or non-numeric cell in a constrained
/// column excludes the row.
fn row_passes(row: &ScreeningRow, spec: &FilterSpec) -> bool {
    spec.ranges()
        .iter()
        .all(|(column, range)| match row.number(column) {
            Some(value) => range.contains(value),
            None => false,
        })
}

/// Filter the table, preserving relative row order. The input table is
/// untouched; the result owns its rows.
pub fn filter(table: &ScreeningTable, spec: &FilterSpec) -> ScreeningTable {
    let rows = table
        .rows
        .iter()
        .filter(|row| row_passes(row, spec))
        .cloned()
        .collect();

    ScreeningTable {
        columns: table.columns.clone(),
        numeric_columns: table.numeric_columns.clone(),
        rows,
    }
}

/// Observed [min, max] per numeric column across the *unfiltered* table.
/// Slider bounds initialize from these once per load and are not
/// recomputed after partial filtering.
pub fn column_bounds(table: &ScreeningTable) -> BTreeMap<String, (f64, f64)> {
    let mut bounds = BTreeMap::new();
    for column in &table.numeric_columns {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in &table.rows {
            if let Some(value) = row.number(column) {
                min = min.min(value);
                max = max.max(value);
            }
        }
        if min <= max {
            bounds.insert(column.clone(), (min, max));
        }
    }
    bounds
}

/// Stable descending sort by one column. Rows without a numeric value in
/// the sort column sink to the end; ties keep original relative order.
pub fn sort_descending(table: &mut ScreeningTable, column: &str) {
    table.rows.sort_by(|a, b| {
        let a_val = a.number(column);
        let b_val = b.number(column);
        match (a_val, b_val) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

/// Restrict the table to the requested columns in the requested order.
/// Columns the table does not carry are silently dropped, not an error.
pub fn project(table: &ScreeningTable, columns: &[String]) -> ScreeningTable {
    let kept: Vec<String> = columns
        .iter()
        .filter(|c| table.columns.iter().any(|tc| tc == *c))
        .cloned()
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| ScreeningRow {
            symbol: row.symbol.clone(),
            cells: row
                .cells
                .iter()
                .filter(|(name, _)| kept.iter().any(|c| c == *name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        })
        .collect();

    ScreeningTable {
        numeric_columns: table
            .numeric_columns
            .iter()
            .filter(|c| kept.iter().any(|k| k == *c))
            .cloned()
            .collect(),
        columns: kept,
        rows,
    }
}

/// Run the full pipeline: filter, then optional descending sort, then
/// projection when the request names columns.
pub fn run_screen(table: &ScreeningTable, request: &ScreenRequest) -> ScreeningTable {
    let mut result = filter(table, &request.spec);
    if let Some(column) = &request.sort_by {
        sort_descending(&mut result, column);
    }
    if !request.columns.is_empty() {
        result = project(&result, &request.columns);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use std::collections::HashMap;

    fn row(symbol: &str, rate: f64, predict: f64) -> ScreeningRow {
        let mut cells = HashMap::new();
        cells.insert("Symbol".to_string(), CellValue::Text(symbol.to_string()));
        cells.insert("Rate".to_string(), CellValue::Number(rate));
        cells.insert("Predict".to_string(), CellValue::Number(predict));
        ScreeningRow {
            symbol: symbol.to_string(),
            cells,
        }
    }

    fn table() -> ScreeningTable {
        ScreeningTable {
            columns: vec![
                "Symbol".to_string(),
                "Rate".to_string(),
                "Predict".to_string(),
            ],
            numeric_columns: vec!["Rate".to_string(), "Predict".to_string()],
            rows: vec![
                row("VCB", 2.0, 0.8),
                row("FPT", 3.5, 0.6),
                row("HPG", 1.0, 0.9),
                row("MWG", 3.5, 0.4),
            ],
        }
    }

    fn symbols(t: &ScreeningTable) -> Vec<&str> {
        t.rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_range_filter_rejects_inverted_bounds() {
        assert!(RangeFilter::new(2.0, 1.0).is_err());
        assert!(RangeFilter::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn test_empty_spec_is_identity() {
        let t = table();
        let filtered = filter(&t, &FilterSpec::new());
        assert_eq!(symbols(&filtered), symbols(&t));
    }

    #[test]
    fn test_filter_inclusive_bounds() {
        let t = table();
        let spec = FilterSpec::new().with_range("Rate", RangeFilter::new(2.0, 3.5).unwrap());
        let filtered = filter(&t, &spec);
        assert_eq!(symbols(&filtered), vec!["VCB", "FPT", "MWG"]);
    }

    #[test]
    fn test_filter_conjunction_across_columns() {
        let t = table();
        let spec = FilterSpec::new()
            .with_range("Rate", RangeFilter::new(2.0, 4.0).unwrap())
            .with_range("Predict", RangeFilter::new(0.5, 1.0).unwrap());
        let filtered = filter(&t, &spec);
        assert_eq!(symbols(&filtered), vec!["VCB", "FPT"]);
    }

    #[test]
    fn test_filter_min_equals_global_min() {
        let t = table();
        let bounds = column_bounds(&t);
        let (min, _) = bounds["Rate"];
        let spec = FilterSpec::new().with_range("Rate", RangeFilter::new(min, min).unwrap());
        let filtered = filter(&t, &spec);
        assert_eq!(symbols(&filtered), vec!["HPG"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let t = table();
        let spec = FilterSpec::new().with_range("Rate", RangeFilter::new(2.0, 3.5).unwrap());
        let once = filter(&t, &spec);
        let twice = filter(&once, &spec);
        assert_eq!(symbols(&once), symbols(&twice));
    }

    #[test]
    fn test_missing_column_excludes_row() {
        let mut t = table();
        t.rows[0].cells.remove("Predict");
        let spec = FilterSpec::new().with_range("Predict", RangeFilter::new(0.0, 1.0).unwrap());
        let filtered = filter(&t, &spec);
        assert!(!symbols(&filtered).contains(&"VCB"));
    }

    #[test]
    fn test_column_bounds_over_unfiltered_table() {
        let bounds = column_bounds(&table());
        assert_eq!(bounds["Rate"], (1.0, 3.5));
        assert_eq!(bounds["Predict"], (0.4, 0.9));
    }

    #[test]
    fn test_sort_descending_stable_on_ties() {
        let mut t = table();
        sort_descending(&mut t, "Rate");
        // FPT and MWG tie at 3.5; FPT appeared first and must stay first
        assert_eq!(symbols(&t), vec!["FPT", "MWG", "VCB", "HPG"]);
    }

    #[test]
    fn test_projection_drops_unknown_columns() {
        let t = table();
        let projected = project(
            &t,
            &[
                "Symbol".to_string(),
                "Rate".to_string(),
                "Nonexistent".to_string(),
            ],
        );
        assert_eq!(projected.columns, vec!["Symbol", "Rate"]);
        assert!(projected.rows[0].cells.get("Predict").is_none());
    }

    #[test]
    fn test_run_screen_full_pipeline() {
        let request = ScreenRequest {
            spec: FilterSpec::new().with_range("Rate", RangeFilter::new(1.5, 4.0).unwrap()),
            sort_by: Some("Rate".to_string()),
            columns: vec!["Symbol".to_string(), "Rate".to_string()],
        };
        let result = run_screen(&table(), &request);
        assert_eq!(symbols(&result), vec!["FPT", "MWG", "VCB"]);
        assert_eq!(result.columns, vec!["Symbol", "Rate"]);
    }

    #[test]
    fn test_parse_arg_with_spaces_in_name() {
        let mut spec = FilterSpec::new();
        spec.parse_arg("Pivot Price (Buy):10.5:99").unwrap();
        let range = spec.ranges()["Pivot Price (Buy)"];
        assert_eq!(range.min, 10.5);
        assert_eq!(range.max, 99.0);
    }

    #[test]
    fn test_parse_arg_rejects_malformed() {
        let mut spec = FilterSpec::new();
        assert!(spec.parse_arg("Rate:1.0").is_err());
        assert!(spec.parse_arg("Rate:abc:2").is_err());
        assert!(spec.parse_arg("Rate:3:1").is_err());
    }
}
