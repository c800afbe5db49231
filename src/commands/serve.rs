use crate::error::{AppError, Result};
use crate::server::{self, AppState, ScreenerState};
use crate::services::{load_companies, load_predictions, ChartService, VciClient};
use crate::utils::{get_companies_path, get_predictions_path};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as TokioMutex;
use tracing::warn;

pub async fn run(port: u16, data: Option<PathBuf>, companies: Option<PathBuf>) -> Result<()> {
    println!("🚀 Starting canslim-screener server on port {}", port);

    let predictions_path = data.unwrap_or_else(get_predictions_path);
    println!("📂 Prediction table: {}", predictions_path.display());
    let table = load_predictions(&predictions_path)?;
    println!(
        "📊 Loaded {} rows, {} numeric columns",
        table.len(),
        table.numeric_columns.len()
    );

    // A missing company table degrades lookups to 404s; the screener and
    // charts still work without it.
    let companies_path = companies.unwrap_or_else(get_companies_path);
    let company_map = match load_companies(&companies_path) {
        Ok(map) => {
            println!(
                "🏢 Company table: {} ({} companies)",
                companies_path.display(),
                map.len()
            );
            map
        }
        Err(e) => {
            warn!(error = %e, "Company table unavailable");
            println!("⚠️  Company table unavailable: {}", e);
            Default::default()
        }
    };

    let vci = VciClient::new(true, 30).map_err(|e| AppError::Network(e.to_string()))?;

    let state = AppState {
        screener: Arc::new(ScreenerState::new(table, company_map)),
        charts: Arc::new(TokioMutex::new(ChartService::new(vci))),
        started_at: Instant::now(),
    };

    if let Err(e) = server::serve(state, port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
