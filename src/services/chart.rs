//! Chart orchestration: fetch history, gap-fill, compute indicators.
//!
//! Holds the VCI client and a per-process memo of fetched series keyed by
//! (symbol, start, end). Identical chart requests during a session reuse
//! the fetched series; indicators recompute per request since the
//! requested set varies.

use crate::engine::{compute_chart, ChartPoint, IndicatorSet};
use crate::error::{AppError, Result};
use crate::models::PriceSeries;
use crate::services::vci::{VciClient, VciError};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    symbol: String,
    start: String,
    end: Option<String>,
}

pub struct ChartService {
    vci: VciClient,
    cache: HashMap<SeriesKey, PriceSeries>,
}

impl ChartService {
    pub fn new(vci: VciClient) -> Self {
        Self {
            vci,
            cache: HashMap::new(),
        }
    }

    pub fn cached_series(&self) -> usize {
        self.cache.len()
    }

    /// Fetch (or reuse) the raw daily series for a symbol. Upstream
    /// failure and zero rows both surface as [`AppError::NoData`].
    pub async fn get_series(
        &mut self,
        symbol: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<PriceSeries> {
        let key = SeriesKey {
            symbol: symbol.to_uppercase(),
            start: start.to_string(),
            end: end.map(String::from),
        };

        if let Some(series) = self.cache.get(&key) {
            return Ok(series.clone());
        }

        let series = match self.vci.get_history(symbol, start, end).await {
            Ok(series) => series,
            Err(VciError::NoData) => {
                warn!(symbol, "VCI returned no history");
                return Err(AppError::NoData(symbol.to_string()));
            }
            Err(VciError::InvalidDate(d)) => {
                return Err(AppError::InvalidInput(format!("invalid date '{}'", d)))
            }
            Err(e) => {
                warn!(symbol, error = %e, "VCI history fetch failed");
                return Err(AppError::NoData(symbol.to_string()));
            }
        };

        info!(symbol, bars = series.len(), "Fetched price history");
        self.cache.insert(key, series.clone());
        Ok(series)
    }

    /// Full chart pipeline: fetch, resample to a continuous daily
    /// calendar, compute the requested indicators.
    pub async fn chart(
        &mut self,
        symbol: &str,
        start: &str,
        end: Option<&str>,
        indicators: &IndicatorSet,
    ) -> Result<Vec<ChartPoint>> {
        let series = self.get_series(symbol, start, end).await?;
        let filled = series.fill_daily_gaps();
        Ok(compute_chart(&filled, indicators))
    }

    /// News snippets for a ticker. A fetch or parse failure degrades to
    /// an empty list; news is decoration around the chart, not data the
    /// caller can act on.
    pub async fn news(&mut self, symbol: &str) -> Vec<crate::models::NewsItem> {
        match self.vci.news(symbol).await {
            Ok(news) => news,
            Err(e) => {
                warn!(symbol, error = %e, "News fetch failed, returning empty list");
                Vec::new()
            }
        }
    }
}
