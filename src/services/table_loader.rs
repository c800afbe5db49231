//! CSV loaders for the prediction table and the company reference table.
//!
//! Both tables load once per process and are held in read-only shared
//! state; every screening request recomputes over the same immutable
//! snapshot.

use crate::constants::SYMBOL_COLUMN;
use crate::error::{AppError, Result};
use crate::models::{CellValue, CompanyProfile, ScreeningRow, ScreeningTable};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Load the prediction table.
///
/// Pandas index artifacts (`Unnamed: 0` and friends) are dropped. A
/// column joins the numeric whitelist iff every non-empty cell parses as
/// a number; filters are only ever offered over whitelisted columns, so
/// the filter engine never sees a non-numeric constrained cell in
/// practice.
pub fn load_predictions(path: &Path) -> Result<ScreeningTable> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut columns: Vec<String> = Vec::new();
    let mut keep: Vec<bool> = Vec::new();
    for name in headers.iter() {
        let dropped = name.starts_with("Unnamed");
        keep.push(!dropped);
        if !dropped {
            columns.push(name.to_string());
        }
    }

    if !columns.iter().any(|c| c == SYMBOL_COLUMN) {
        return Err(AppError::Parse(format!(
            "prediction table has no '{}' column",
            SYMBOL_COLUMN
        )));
    }

    let mut numeric: HashMap<String, bool> = columns.iter().map(|c| (c.clone(), true)).collect();
    let mut raw_rows: Vec<HashMap<String, String>> = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut cells = HashMap::new();
        let mut col_iter = columns.iter();
        for (i, value) in record.iter().enumerate() {
            if !keep.get(i).copied().unwrap_or(false) {
                continue;
            }
            let Some(column) = col_iter.next() else { break };
            let value = value.trim();
            if !value.is_empty() && value.parse::<f64>().is_err() {
                numeric.insert(column.clone(), false);
            }
            cells.insert(column.clone(), value.to_string());
        }
        raw_rows.push(cells);
    }

    // Symbol is the string key even when every ticker happens to look
    // numeric
    numeric.insert(SYMBOL_COLUMN.to_string(), false);

    let numeric_columns: Vec<String> = columns
        .iter()
        .filter(|c| numeric.get(*c).copied().unwrap_or(false))
        .cloned()
        .collect();

    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        let symbol = raw.get(SYMBOL_COLUMN).cloned().unwrap_or_default();
        if symbol.is_empty() {
            warn!("Skipping prediction row without a symbol");
            continue;
        }
        let cells = raw
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(column, value)| {
                let cell = if numeric.get(&column).copied().unwrap_or(false) {
                    match value.parse::<f64>() {
                        Ok(n) => CellValue::Number(n),
                        Err(_) => CellValue::Text(value),
                    }
                } else {
                    CellValue::Text(value)
                };
                (column, cell)
            })
            .collect();
        rows.push(ScreeningRow { symbol, cells });
    }

    info!(
        rows = rows.len(),
        numeric_columns = numeric_columns.len(),
        "Loaded prediction table from {}",
        path.display()
    );

    Ok(ScreeningTable {
        columns,
        numeric_columns,
        rows,
    })
}

/// Header aliases from historical reference-table exports, mapped onto
/// the canonical [`CompanyProfile`] schema.
fn canonical_field(header: &str) -> Option<&'static str> {
    match header.trim().to_ascii_lowercase().as_str() {
        "symbol" | "ticker" => Some("symbol"),
        "company name" | "organization name" | "name" => Some("company_name"),
        "industry" | "icb industry" | "sector" => Some("industry"),
        "founding" | "founded" | "organization founded year" | "founded year" => {
            Some("founded_year")
        }
        "exchange" | "listed exchange" => Some("exchange"),
        _ => None,
    }
}

/// Load the company reference table keyed by upper-cased ticker symbol.
/// Unknown headers are ignored; a row without a symbol is skipped.
pub fn load_companies(path: &Path) -> Result<HashMap<String, CompanyProfile>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let fields: Vec<Option<&'static str>> = headers.iter().map(canonical_field).collect();

    if !fields.contains(&Some("symbol")) {
        return Err(AppError::Parse(format!(
            "company table {} has no symbol/ticker column",
            path.display()
        )));
    }

    let mut companies = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let mut profile = CompanyProfile::new("");
        for (i, value) in record.iter().enumerate() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match fields.get(i).copied().flatten() {
                Some("symbol") => profile.symbol = value.to_uppercase(),
                Some("company_name") => profile.company_name = Some(value.to_string()),
                Some("industry") => profile.industry = Some(value.to_string()),
                Some("founded_year") => {
                    // Tolerate "1993.0" from spreadsheet round-trips
                    profile.founded_year = value
                        .parse::<u32>()
                        .ok()
                        .or_else(|| value.parse::<f64>().ok().map(|y| y as u32));
                }
                Some("exchange") => profile.exchange = Some(value.to_string()),
                _ => {}
            }
        }
        if profile.symbol.is_empty() {
            warn!("Skipping company row without a symbol");
            continue;
        }
        companies.insert(profile.symbol.clone(), profile);
    }

    info!(
        companies = companies.len(),
        "Loaded company table from {}",
        path.display()
    );
    Ok(companies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_predictions_numeric_whitelist() {
        let path = write_temp(
            "screener_predictions_test.csv",
            "Unnamed: 0,Symbol,Rate,Predict,Note\n\
             0,VCB,2.5,0.8,strong\n\
             1,FPT,3.0,0.6,hold\n",
        );

        let table = load_predictions(&path).unwrap();
        assert_eq!(table.len(), 2);
        // Index artifact dropped, Note is text, Symbol never numeric
        assert_eq!(table.columns, vec!["Symbol", "Rate", "Predict", "Note"]);
        assert_eq!(table.numeric_columns, vec!["Rate", "Predict"]);
        assert_eq!(table.rows[0].symbol, "VCB");
        assert_eq!(table.rows[0].number("Rate"), Some(2.5));
        assert_eq!(table.rows[1].number("Rate"), Some(3.0));
    }

    #[test]
    fn test_load_predictions_empty_cells_stay_numeric() {
        let path = write_temp(
            "screener_predictions_blank_test.csv",
            "Symbol,Rate\nVCB,2.5\nFPT,\n",
        );

        let table = load_predictions(&path).unwrap();
        assert_eq!(table.numeric_columns, vec!["Rate"]);
        assert_eq!(table.rows[1].number("Rate"), None);
    }

    #[test]
    fn test_load_predictions_requires_symbol_column() {
        let path = write_temp("screener_predictions_nosym_test.csv", "Ticker,Rate\nVCB,1\n");
        assert!(load_predictions(&path).is_err());
    }

    #[test]
    fn test_load_companies_header_aliases() {
        let path = write_temp(
            "screener_companies_test.csv",
            "ticker,Organization Name,Industry,Organization Founded Year,Exchange\n\
             vcb,Vietcombank,Banking,1963.0,HOSE\n\
             fpt,FPT Corp,Technology,1988,HOSE\n",
        );

        let companies = load_companies(&path).unwrap();
        assert_eq!(companies.len(), 2);

        let vcb = &companies["VCB"];
        assert_eq!(vcb.company_name.as_deref(), Some("Vietcombank"));
        assert_eq!(vcb.founded_year, Some(1963));
        assert_eq!(vcb.exchange.as_deref(), Some("HOSE"));
        assert_eq!(companies["FPT"].founded_year, Some(1988));
    }
}
