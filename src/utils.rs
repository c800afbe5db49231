use std::path::PathBuf;

/// Get the prediction table path from environment variable or use default
pub fn get_predictions_path() -> PathBuf {
    std::env::var("SCREENER_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/predictions.csv"))
}

/// Get the company reference table path from environment variable or use default
pub fn get_companies_path() -> PathBuf {
    std::env::var("COMPANY_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/companies.csv"))
}
