use crate::constants::{DEFAULT_DISPLAY_COLUMNS, RATE_COLUMN};
use crate::engine::{run_screen, FilterSpec, ScreenRequest};
use crate::error::Result;
use crate::models::{CellValue, ScreeningTable};
use crate::services::load_predictions;
use crate::utils::get_predictions_path;
use std::path::PathBuf;

pub fn run(
    data: Option<PathBuf>,
    filters: Vec<String>,
    sort: Option<String>,
    columns: Option<String>,
) -> Result<()> {
    let path = data.unwrap_or_else(get_predictions_path);
    println!("📂 Loading prediction table: {}", path.display());

    let table = load_predictions(&path)?;
    println!(
        "📊 {} rows, {} numeric columns",
        table.len(),
        table.numeric_columns.len()
    );

    let mut spec = FilterSpec::new();
    for arg in &filters {
        spec.parse_arg(arg)?;
    }

    let sort_by = sort.or_else(|| {
        table
            .is_numeric_column(RATE_COLUMN)
            .then(|| RATE_COLUMN.to_string())
    });

    let columns: Vec<String> = match columns {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => DEFAULT_DISPLAY_COLUMNS.iter().map(|s| s.to_string()).collect(),
    };

    let request = ScreenRequest {
        spec,
        sort_by,
        columns,
    };
    let result = run_screen(&table, &request);

    if result.is_empty() {
        println!("⚠️  No rows match the given filters");
        return Ok(());
    }

    print_table(&result);
    println!("✅ {} rows", result.len());
    Ok(())
}

fn print_table(table: &ScreeningTable) {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| {
            table
                .rows
                .iter()
                .map(|row| cell_text(row.cells.get(column)).len())
                .max()
                .unwrap_or(0)
                .max(column.len())
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:>width$}", c, width = w))
        .collect();
    println!("{}", header.join("  "));

    for row in &table.rows {
        let line: Vec<String> = table
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, w)| {
                format!("{:>width$}", cell_text(row.cells.get(column)), width = w)
            })
            .collect();
        println!("{}", line.join("  "));
    }
}

fn cell_text(cell: Option<&CellValue>) -> String {
    match cell {
        Some(CellValue::Number(n)) => format!("{}", n),
        Some(CellValue::Text(s)) => s.clone(),
        None => String::new(),
    }
}
