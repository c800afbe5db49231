use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar.
///
/// # Price Format
/// Prices are full VND for stock tickers (e.g. 23200.0, not 23.2) and
/// actual index points for VNINDEX/VN30. The VCI API already returns
/// full format, so no scaling happens here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date (no intraday component)
    pub date: NaiveDate,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Trading volume (number of shares; 0 on gap-filled calendar days)
    pub volume: u64,
}

/// An ordered daily price series: strictly increasing by date, no
/// duplicate dates. Construction enforces both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from raw bars: sort ascending by date and collapse
    /// duplicate dates keeping the first occurrence, matching the
    /// upstream "drop duplicate timestamps" behavior.
    pub fn from_bars(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// High prices in date order.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// Low prices in date order.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Resample to a continuous daily calendar, forward-filling OHLC from
    /// the previous bar for non-trading days. Filled bars carry volume 0.
    ///
    /// Indicator windows count calendar days, so this must run before any
    /// indicator computation.
    pub fn fill_daily_gaps(&self) -> PriceSeries {
        let Some(first) = self.bars.first() else {
            return PriceSeries::default();
        };

        let mut filled = Vec::with_capacity(self.bars.len());
        let mut prev = first.clone();
        let mut expected = first.date;

        for bar in &self.bars {
            // Emit carried-forward bars for every skipped calendar day
            while expected < bar.date {
                filled.push(PriceBar {
                    date: expected,
                    open: prev.open,
                    high: prev.high,
                    low: prev.low,
                    close: prev.close,
                    volume: 0,
                });
                expected += Duration::days(1);
            }
            filled.push(bar.clone());
            prev = bar.clone();
            expected = bar.date + Duration::days(1);
        }

        PriceSeries { bars: filled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn test_from_bars_sorts_and_deduplicates() {
        let series = PriceSeries::from_bars(vec![
            bar("2024-01-03", 12.0),
            bar("2024-01-01", 10.0),
            bar("2024-01-01", 99.0), // duplicate, first occurrence wins
            bar("2024-01-02", 11.0),
        ]);

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_from_bars_duplicate_first_wins() {
        // Sort is stable, so the earlier element of equal dates survives
        let series = PriceSeries::from_bars(vec![bar("2024-01-01", 10.0), bar("2024-01-01", 99.0)]);
        assert_eq!(series.bars()[0].close, 10.0);
    }

    #[test]
    fn test_fill_daily_gaps_carries_forward() {
        // Friday, then Monday: Saturday and Sunday must appear with the
        // Friday bar carried forward and zero volume.
        let series = PriceSeries::from_bars(vec![bar("2024-01-05", 10.0), bar("2024-01-08", 12.0)]);
        let filled = series.fill_daily_gaps();

        assert_eq!(filled.len(), 4);
        assert_eq!(filled.bars()[1].close, 10.0);
        assert_eq!(filled.bars()[2].close, 10.0);
        assert_eq!(filled.bars()[1].volume, 0);
        assert_eq!(
            filled.bars()[2].date,
            NaiveDate::parse_from_str("2024-01-07", "%Y-%m-%d").unwrap()
        );
        assert_eq!(filled.bars()[3].close, 12.0);
    }

    #[test]
    fn test_fill_daily_gaps_empty() {
        let filled = PriceSeries::default().fill_daily_gaps();
        assert!(filled.is_empty());
    }
}
