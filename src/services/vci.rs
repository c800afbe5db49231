//! VCI (Vietcap) market-data client.
//!
//! Fetches daily OHLC history from the trading API's columnar chart
//! endpoint and company/news metadata from the GraphQL endpoint. The
//! client rotates browser user agents, rate-limits itself with a sliding
//! one-minute window, and retries transient failures with exponential
//! backoff. 4xx responses other than 403/429 are request bugs and are
//! not retried.

use crate::models::{CompanyProfile, NewsItem, PriceBar, PriceSeries};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use isahc::{config::Configurable, prelude::*, HttpClient};
use serde_json::Value;
use std::time::{Duration as StdDuration, SystemTime};
use thiserror::Error as ThisError;
use tokio::time::sleep;

#[derive(ThisError, Debug)]
pub enum VciError {
    #[error("HTTP error: {0}")]
    Http(#[from] isahc::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No data available")]
    NoData,
}

const BASE_URL: &str = "https://trading.vietcap.com.vn/api/";
const MAX_RETRIES: u32 = 5;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
];

pub struct VciClient {
    client: HttpClient,
    base_url: String,
    rate_limit_per_minute: u32,
    request_timestamps: Vec<SystemTime>,
    random_agent: bool,
}

impl VciClient {
    pub fn new(random_agent: bool, rate_limit_per_minute: u32) -> Result<Self, VciError> {
        let client = HttpClient::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            rate_limit_per_minute,
            request_timestamps: Vec::new(),
            random_agent,
        })
    }

    fn get_user_agent(&self) -> &'static str {
        if self.random_agent {
            use rand::seq::SliceRandom;
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
        } else {
            USER_AGENTS[0]
        }
    }

    /// Sliding-window rate limit: never more than
    /// `rate_limit_per_minute` requests in any 60 second span.
    async fn enforce_rate_limit(&mut self) {
        let current_time = SystemTime::now();
        self.request_timestamps.retain(|&timestamp| {
            current_time
                .duration_since(timestamp)
                .unwrap_or(StdDuration::from_secs(0))
                < StdDuration::from_secs(60)
        });

        if self.request_timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest) = self.request_timestamps.first() {
                let elapsed = current_time
                    .duration_since(oldest)
                    .unwrap_or(StdDuration::from_secs(0));
                let wait_time = StdDuration::from_secs(60).saturating_sub(elapsed);
                if !wait_time.is_zero() {
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                }
            }
        }

        self.request_timestamps.push(current_time);
    }

    async fn make_request(&mut self, url: &str, payload: &Value) -> Result<Value, VciError> {
        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(
                    2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>(),
                );
                let delay = delay.min(StdDuration::from_secs(60));
                let reason = last_error.as_deref().unwrap_or("unknown error");
                tracing::info!(
                    "VCI retry backoff: attempt {}/{} - reason: {}, waiting {:.1}s",
                    attempt + 1,
                    MAX_RETRIES,
                    reason,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            let body = serde_json::to_string(payload)?;
            tracing::debug!(url, payload_size = body.len(), attempt = attempt + 1, "VCI request");

            let request = isahc::Request::builder()
                .uri(url)
                .method("POST")
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9,vi-VN;q=0.8,vi;q=0.7")
                .header("Content-Type", "application/json")
                .header("User-Agent", self.get_user_agent())
                .header("Referer", "https://trading.vietcap.com.vn/")
                .header("Origin", "https://trading.vietcap.com.vn")
                .body(body)
                .map_err(|e| VciError::InvalidResponse(format!("Request build error: {}", e)))?;

            match self.client.send_async(request).await {
                Ok(mut resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(text) => match serde_json::from_str::<Value>(&text) {
                                Ok(data) => return Ok(data),
                                Err(e) => {
                                    last_error = Some(format!("JSON parse error: {}", e));
                                    continue;
                                }
                            },
                            Err(e) => {
                                last_error = Some(format!("Response body error: {}", e));
                                continue;
                            }
                        }
                    } else if status == 403 || status == 429 || status.is_server_error() {
                        last_error = Some(format!("HTTP {} - retryable", status.as_u16()));
                        continue;
                    } else {
                        return Err(VciError::InvalidResponse(format!(
                            "Client error ({}) - not retryable",
                            status.as_u16()
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(format!("Network error: {}", e));
                    continue;
                }
            }
        }

        Err(VciError::InvalidResponse(
            "Max retries exceeded".to_string(),
        ))
    }

    fn parse_date(date: &str) -> Result<NaiveDate, VciError> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| VciError::InvalidDate(date.to_string()))
    }

    /// End-of-day timestamp for the request's `to` field. `None` means
    /// today.
    fn calculate_timestamp(end: Option<&str>) -> Result<i64, VciError> {
        let date = match end {
            Some(d) => Self::parse_date(d)?,
            None => Utc::now().date_naive(),
        };
        let end_of_day = date
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| VciError::InvalidDate(date.to_string()))?;
        Ok(end_of_day.and_utc().timestamp())
    }

    /// The API wants a bar count, not a start date: count the business
    /// days in the span and pad generously so the start date is always
    /// covered, then trim client-side.
    fn calculate_count_back(start: NaiveDate, end: Option<NaiveDate>) -> u32 {
        let end_date = end.unwrap_or_else(|| Utc::now().date_naive());

        let mut business_days = 0u32;
        let mut current = start;
        while current <= end_date {
            let weekday = current.weekday().num_days_from_sunday();
            if weekday != 0 && weekday != 6 {
                business_days += 1;
            }
            current += ChronoDuration::days(1);
        }

        business_days + 100
    }

    /// Fetch daily OHLC history for one symbol. Returns a series already
    /// deduplicated and sorted ascending; [`VciError::NoData`] when the
    /// API has nothing for the symbol.
    pub async fn get_history(
        &mut self,
        symbol: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<PriceSeries, VciError> {
        let start_date = Self::parse_date(start)?;
        let end_date = end.map(Self::parse_date).transpose()?;
        let end_timestamp = Self::calculate_timestamp(end)?;
        let count_back = Self::calculate_count_back(start_date, end_date);

        let url = format!("{}chart/OHLCChart/gap-chart", self.base_url);
        let payload = serde_json::json!({
            "timeFrame": "ONE_DAY",
            "symbols": [symbol],
            "to": end_timestamp,
            "countBack": count_back
        });

        tracing::debug!(symbol, start, ?end, count_back, "VCI history request");

        let response_data = self.make_request(&url, &payload).await?;

        let data_item = match response_data.as_array() {
            Some(items) if !items.is_empty() => &items[0],
            _ => return Err(VciError::NoData),
        };

        for key in ["o", "h", "l", "c", "v", "t"] {
            if data_item.get(key).is_none() {
                return Err(VciError::InvalidResponse(format!("Missing key: {}", key)));
            }
        }

        let column = |key: &str| -> Result<&Vec<Value>, VciError> {
            data_item[key]
                .as_array()
                .ok_or_else(|| VciError::InvalidResponse(format!("Invalid column '{}'", key)))
        };
        let opens = column("o")?;
        let highs = column("h")?;
        let lows = column("l")?;
        let closes = column("c")?;
        let volumes = column("v")?;
        let times = column("t")?;

        let length = times.len();
        if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
            .iter()
            .any(|&len| len != length)
        {
            return Err(VciError::InvalidResponse(
                "Inconsistent array lengths".to_string(),
            ));
        }

        let mut bars = Vec::new();
        for i in 0..length {
            // Timestamps arrive as either JSON numbers or numeric strings
            let timestamp = if let Some(ts_str) = times[i].as_str() {
                ts_str.parse::<i64>().map_err(|_| {
                    VciError::InvalidResponse(format!("Bad timestamp '{}' at index {}", ts_str, i))
                })?
            } else if let Some(ts_int) = times[i].as_i64() {
                ts_int
            } else {
                return Err(VciError::InvalidResponse(format!(
                    "Bad timestamp at index {}",
                    i
                )));
            };

            let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
                .ok_or_else(|| {
                    VciError::InvalidResponse(format!("Timestamp {} out of range", timestamp))
                })?
                .date_naive();

            // The countBack padding overshoots; trim to the request span
            if date < start_date {
                continue;
            }
            if let Some(end_date) = end_date {
                if date > end_date {
                    continue;
                }
            }

            bars.push(PriceBar {
                date,
                open: opens[i].as_f64().unwrap_or(0.0),
                high: highs[i].as_f64().unwrap_or(0.0),
                low: lows[i].as_f64().unwrap_or(0.0),
                close: closes[i].as_f64().unwrap_or(0.0),
                volume: volumes[i].as_u64().unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(VciError::NoData);
        }

        Ok(PriceSeries::from_bars(bars))
    }

    /// Company listing/price metadata plus the news block, from the
    /// GraphQL endpoint.
    pub async fn company_info(
        &mut self,
        symbol: &str,
    ) -> Result<(CompanyProfile, Vec<NewsItem>), VciError> {
        let url = self.base_url.replace("/api/", "/data-mt/") + "graphql";

        let graphql_query = r#"query Query($ticker: String!, $lang: String!) {
            News(ticker: $ticker, langCode: $lang) {
                newsTitle
                newsSourceLink
                publicDate
                newsShortContent
            }
            CompanyListingInfo(ticker: $ticker) {
                companyProfile
                icbName3
                history
            }
            TickerPriceInfo(ticker: $ticker) {
                ticker
                exchange
            }
        }"#;

        let payload = serde_json::json!({
            "query": graphql_query,
            "variables": {
                "ticker": symbol.to_uppercase(),
                "lang": "vi"
            }
        });

        let response_data = self.make_request(&url, &payload).await?;
        let data = response_data.get("data").ok_or(VciError::NoData)?;

        let mut profile = CompanyProfile::new(symbol.to_uppercase());

        if let Some(listing) = data.get("CompanyListingInfo") {
            if let Some(industry) = listing.get("icbName3").and_then(|v| v.as_str()) {
                profile.industry = Some(industry.to_string());
            }
        }
        if let Some(price_info) = data.get("TickerPriceInfo") {
            if let Some(exchange) = price_info.get("exchange").and_then(|v| v.as_str()) {
                profile.exchange = Some(exchange.to_string());
            }
        }

        let news = Self::parse_news(data);
        Ok((profile, news))
    }

    /// News snippets only. Callers treat any failure as an empty list.
    pub async fn news(&mut self, symbol: &str) -> Result<Vec<NewsItem>, VciError> {
        let (_, news) = self.company_info(symbol).await?;
        Ok(news)
    }

    fn parse_news(data: &Value) -> Vec<NewsItem> {
        let Some(items) = data.get("News").and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let title = item.get("newsTitle").and_then(|v| v.as_str())?;
                Some(NewsItem {
                    title: title.to_string(),
                    source_link: item
                        .get("newsSourceLink")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    published_at: item
                        .get("publicDate")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    short_content: item
                        .get("newsShortContent")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(VciClient::new(true, 6).is_ok());
    }

    #[test]
    fn test_count_back_covers_span() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        // 23 business days in January 2024, plus the buffer
        assert_eq!(VciClient::calculate_count_back(start, Some(end)), 123);
    }

    #[test]
    fn test_calculate_timestamp_end_of_day() {
        let ts = VciClient::calculate_timestamp(Some("2024-01-15")).unwrap();
        let dt = DateTime::<Utc>::from_timestamp(ts, 0).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 23:59:59");
    }

    #[test]
    fn test_calculate_timestamp_rejects_bad_date() {
        assert!(VciClient::calculate_timestamp(Some("15/01/2024")).is_err());
    }

    #[test]
    fn test_parse_news_missing_block_is_empty() {
        let data = serde_json::json!({ "CompanyListingInfo": null });
        assert!(VciClient::parse_news(&data).is_empty());
    }

    #[test]
    fn test_parse_news_extracts_fields() {
        let data = serde_json::json!({
            "News": [
                {
                    "newsTitle": "VCB announces dividend",
                    "newsSourceLink": "https://example.com/a",
                    "publicDate": "2024-03-01",
                    "newsShortContent": "Board approved..."
                },
                { "newsSourceLink": "https://example.com/untitled" }
            ]
        });
        let news = VciClient::parse_news(&data);
        // The untitled item is dropped
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title, "VCB announces dividend");
        assert_eq!(news[0].published_at.as_deref(), Some("2024-03-01"));
    }
}
