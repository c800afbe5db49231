use crate::constants::{DEFAULT_DISPLAY_COLUMNS, RATE_COLUMN};
use crate::engine::{run_screen, FilterSpec, IndicatorSet, ScreenRequest};
use crate::error::{AppError, Result};
use crate::models::{CellValue, ScreeningTable};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Query parameters for /screener
#[derive(Debug, Deserialize)]
pub struct ScreenQuery {
    /// Range constraints, repeatable: filter=Rate:1.5:3&filter=Predict:0:1
    #[serde(default)]
    pub filter: Vec<String>,

    /// Column for the descending sort; defaults to Rate when present
    pub sort: Option<String>,

    /// Comma-separated display projection; defaults to the CANSLIM
    /// display set
    pub columns: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub count: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

/// Render rows as JSON objects in the table's column order.
fn rows_to_json(table: &ScreeningTable) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for column in &table.columns {
                let value = match row.cells.get(column) {
                    Some(CellValue::Number(n)) => Value::from(*n),
                    Some(CellValue::Text(s)) => Value::from(s.clone()),
                    None => Value::Null,
                };
                obj.insert(column.clone(), value);
            }
            Value::Object(obj)
        })
        .collect()
}

/// GET /screener - filter, sort and project the prediction table
///
/// Examples:
/// - /screener (default projection, Rate descending)
/// - /screener?filter=Rate:2:4&filter=Predict:0.5:1
/// - /screener?sort=Predict&columns=Symbol,Predict
#[instrument(skip(state))]
pub async fn screener_handler(
    State(state): State<AppState>,
    Query(params): Query<ScreenQuery>,
) -> Result<Json<ScreenResponse>> {
    debug!(?params, "Screener request");

    let mut spec = FilterSpec::new();
    for arg in &params.filter {
        spec.parse_arg(arg)?;
    }

    for column in spec.ranges().keys() {
        if !state.screener.table.is_numeric_column(column) {
            return Err(AppError::InvalidInput(format!(
                "'{}' is not a filterable numeric column",
                column
            )));
        }
    }

    let sort_by = match params.sort {
        Some(column) => {
            if !state.screener.table.is_numeric_column(&column) {
                return Err(AppError::InvalidInput(format!(
                    "'{}' is not a sortable numeric column",
                    column
                )));
            }
            Some(column)
        }
        None if state.screener.table.is_numeric_column(RATE_COLUMN) => {
            Some(RATE_COLUMN.to_string())
        }
        None => None,
    };

    let columns: Vec<String> = match &params.columns {
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
    let result = run_screen(&state.screener.table, &request);

    Ok(Json(ScreenResponse {
        count: result.len(),
        columns: result.columns.clone(),
        rows: rows_to_json(&result),
    }))
}

#[derive(Debug, Serialize)]
pub struct ColumnBound {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    pub numeric_columns: Vec<String>,
    pub bounds: Vec<ColumnBound>,
}

/// GET /screener/columns - filterable columns and their unfiltered bounds
pub async fn columns_handler(State(state): State<AppState>) -> Json<ColumnsResponse> {
    let bounds = state
        .screener
        .bounds
        .iter()
        .map(|(column, (min, max))| ColumnBound {
            column: column.clone(),
            min: *min,
            max: *max,
        })
        .collect();

    Json(ColumnsResponse {
        numeric_columns: state.screener.table.numeric_columns.clone(),
        bounds,
    })
}

/// Query parameters for /chart
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub symbol: String,

    /// Start date (YYYY-MM-DD); defaults to one year back handled by the
    /// command layer, required here
    pub start_date: String,

    /// End date (YYYY-MM-DD), defaults to today
    pub end_date: Option<String>,

    /// Comma-separated indicator list (sma,rsi,macd,bollinger,stochastic);
    /// omitted means all
    pub indicators: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub symbol: String,
    pub count: usize,
    pub points: Vec<crate::engine::ChartPoint>,
}

/// GET /chart - daily candles with requested indicator overlays
///
/// The series is resampled to a continuous daily calendar with forward-
/// filled gaps before indicators are computed. A failed or empty upstream
/// fetch returns 404 so the caller can render a warning instead of an
/// empty chart.
#[instrument(skip(state))]
pub async fn chart_handler(
    State(state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> Result<Json<ChartResponse>> {
    let indicators = match &params.indicators {
        Some(list) => {
            let set = IndicatorSet::parse(list)?;
            // An empty list means no overlays were deselected, not none
            if set.is_empty() {
                IndicatorSet::all()
            } else {
                set
            }
        }
        None => IndicatorSet::all(),
    };

    let mut charts = state.charts.lock().await;
    let points = charts
        .chart(
            &params.symbol,
            &params.start_date,
            params.end_date.as_deref(),
            &indicators,
        )
        .await?;

    Ok(Json(ChartResponse {
        symbol: params.symbol.to_uppercase(),
        count: points.len(),
        points,
    }))
}

/// GET /companies/{symbol} - company reference lookup
pub async fn company_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<crate::models::CompanyProfile>> {
    let symbol = symbol.to_uppercase();
    state
        .screener
        .companies
        .get(&symbol)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound(format!("company {}", symbol)))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub symbol: String,
    pub items: Vec<crate::models::NewsItem>,
}

/// GET /news - news snippets for a ticker; fetch failures degrade to an
/// empty list rather than an error
pub async fn news_handler(
    State(state): State<AppState>,
    Query(params): Query<NewsQuery>,
) -> Json<NewsResponse> {
    let mut charts = state.charts.lock().await;
    let items = charts.news(&params.symbol).await;
    Json(NewsResponse {
        symbol: params.symbol.to_uppercase(),
        items,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub prediction_rows: usize,
    pub numeric_columns: usize,
    pub companies: usize,
    pub cached_series: usize,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cached_series = state.charts.lock().await.cached_series();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        prediction_rows: state.screener.table.len(),
        numeric_columns: state.screener.table.numeric_columns.len(),
        companies: state.screener.companies.len(),
        cached_series,
    })
}
