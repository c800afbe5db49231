pub mod api;

use crate::engine::column_bounds;
use crate::error::AppError;
use crate::models::{CompanyProfile, ScreeningTable};
use crate::services::ChartService;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as TokioMutex;
use tower_http::cors::{Any, CorsLayer};

/// Read-only screening state, loaded once at startup. Filter requests
/// recompute over this snapshot; nothing mutates it.
pub struct ScreenerState {
    pub table: ScreeningTable,
    /// Unfiltered per-column bounds, computed once at load (slider
    /// initialization semantics).
    pub bounds: BTreeMap<String, (f64, f64)>,
    pub companies: HashMap<String, CompanyProfile>,
}

impl ScreenerState {
    pub fn new(table: ScreeningTable, companies: HashMap<String, CompanyProfile>) -> Self {
        let bounds = column_bounds(&table);
        Self {
            table,
            bounds,
            companies,
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub screener: Arc<ScreenerState>,
    pub charts: Arc<TokioMutex<ChartService>>,
    pub started_at: Instant,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) | AppError::NoData(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Parse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/screener", get(api::screener_handler))
        .route("/screener/columns", get(api::columns_handler))
        .route("/chart", get(api::chart_handler))
        .route("/companies/{symbol}", get(api::company_handler))
        .route("/news", get(api::news_handler))
        .route("/health", get(api::health_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET /screener?filter=Rate:1.5:3&sort=Rate&columns=Symbol,Rate");
    tracing::info!("  GET /screener/columns");
    tracing::info!("  GET /chart?symbol=VCB&start_date=2024-01-01&indicators=sma,rsi");
    tracing::info!("  GET /companies/{{symbol}}");
    tracing::info!("  GET /news?symbol=VCB");
    tracing::info!("  GET /health");

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
