//! Technical indicator computation over daily price series.
//!
//! Every indicator is a pure transform of a gap-filled [`PriceSeries`]
//! into per-bar optional values. `None` marks the unfilled leading
//! window, or a point where the formula is undefined (flat stochastic
//! window). Callers must gap-fill before computing: windows count
//! calendar days, not trading days.
//!
//! # Price Format
//! Input prices are full VND for stock tickers (23200.0, not 23.2) and
//! actual points for indices. All outputs share the input's format except
//! RSI and %K/%D, which are percentages.

use crate::constants::{
    BOLLINGER_K, BOLLINGER_WINDOW, MACD_FAST_SPAN, MACD_SIGNAL_SPAN, MACD_SLOW_SPAN, RSI_WINDOW,
    SMA_FAST_WINDOW, SMA_SLOW_WINDOW, STOCH_SMOOTH_WINDOW, STOCH_WINDOW,
};
use crate::error::{AppError, Result};
use crate::models::PriceSeries;
use serde::{Deserialize, Serialize};

/// Calculate Simple Moving Average for a given window
///
/// Returns one value per input index; `None` until the window fills.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    out
}

/// Calculate Exponential Moving Average with the given span
///
/// Smoothing factor is 2/(span+1), seeded by the first value rather than
/// a simple-average seed, so every index has a value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// Calculate Relative Strength Index over a rolling window
///
/// Gains and losses are simple rolling means of the one-day deltas. When
/// the average loss is zero the relative strength is infinite and RSI
/// saturates at exactly 100 instead of propagating a division error.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() <= window {
        return out;
    }

    let mut gains = vec![0.0; closes.len()];
    let mut losses = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    // First defined index needs `window` deltas, i.e. index `window`
    for i in window..closes.len() {
        let start = i + 1 - window;
        let avg_gain: f64 = gains[start..=i].iter().sum::<f64>() / window as f64;
        let avg_loss: f64 = losses[start..=i].iter().sum::<f64>() / window as f64;

        out[i] = if avg_loss == 0.0 {
            Some(100.0)
        } else {
            let rs = avg_gain / avg_loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        };
    }
    out
}

/// MACD line, signal line and histogram, aligned by input index.
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Calculate MACD: EMA(fast) - EMA(slow), its EMA signal line, and the
/// macd - signal histogram
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> Macd {
    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&macd_line, signal_span);
    let histogram: Vec<f64> = macd_line.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Macd {
        macd: macd_line,
        signal,
        histogram,
    }
}

/// Bollinger middle/upper/lower bands, aligned by input index.
#[derive(Debug, Clone)]
pub struct Bollinger {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands: SMA(window) +/- k rolling standard
/// deviations. Sample standard deviation (ddof = 1) throughout.
pub fn bollinger(closes: &[f64], window: usize, k: f64) -> Bollinger {
    let middle = sma(closes, window);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    if window >= 2 && closes.len() >= window {
        for i in (window - 1)..closes.len() {
            let slice = &closes[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance =
                slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
            let stddev = variance.sqrt();
            upper[i] = middle[i].map(|m| m + k * stddev);
            lower[i] = middle[i].map(|m| m - k * stddev);
        }
    }

    Bollinger {
        middle,
        upper,
        lower,
    }
}

/// Stochastic oscillator fast (%K) and slow (%D) lines.
#[derive(Debug, Clone)]
pub struct Stochastic {
    pub percent_k: Vec<Option<f64>>,
    pub percent_d: Vec<Option<f64>>,
}

/// Calculate the Stochastic Oscillator.
///
/// %K = 100 * (close - lowMin) / (highMax - lowMin) over `window`;
/// %D is the SMA of %K over `smooth_window`. A flat window
/// (highMax == lowMin) leaves %K undefined rather than dividing by zero.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    window: usize,
    smooth_window: usize,
) -> Stochastic {
    let len = closes.len();
    let mut percent_k = vec![None; len];
    if window == 0 || len < window || highs.len() != len || lows.len() != len {
        return Stochastic {
            percent_d: vec![None; len],
            percent_k,
        };
    }

    for i in (window - 1)..len {
        let start = i + 1 - window;
        let low_min = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let high_max = highs[start..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let range = high_max - low_min;
        if range > 0.0 {
            percent_k[i] = Some(100.0 * (closes[i] - low_min) / range);
        }
    }

    // %D: mean over the trailing smooth window, only when every %K in
    // the window is defined
    let mut percent_d = vec![None; len];
    if smooth_window > 0 {
        for i in (smooth_window - 1)..len {
            let slice = &percent_k[i + 1 - smooth_window..=i];
            if slice.iter().all(Option::is_some) {
                let sum: f64 = slice.iter().flatten().sum();
                percent_d[i] = Some(sum / smooth_window as f64);
            }
        }
    }

    Stochastic {
        percent_k,
        percent_d,
    }
}

/// Which indicator families to compute for a chart request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSet {
    pub sma: bool,
    pub rsi: bool,
    pub macd: bool,
    pub bollinger: bool,
    pub stochastic: bool,
}

impl IndicatorSet {
    pub fn all() -> Self {
        Self {
            sma: true,
            rsi: true,
            macd: true,
            bollinger: true,
            stochastic: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse a comma-separated list like `sma,rsi,macd`. Unknown names
    /// are rejected so typos surface instead of silently dropping an
    /// overlay.
    pub fn parse(list: &str) -> Result<Self> {
        let mut set = Self::default();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "sma" => set.sma = true,
                "rsi" => set.rsi = true,
                "macd" => set.macd = true,
                "bollinger" | "bb" => set.bollinger = true,
                "stochastic" | "stoch" => set.stochastic = true,
                other => {
                    return Err(AppError::InvalidInput(format!(
                        "unknown indicator '{}'",
                        other
                    )))
                }
            }
        }
        Ok(set)
    }
}

/// One chart bar augmented with the requested indicator values. Fields
/// stay `None` (and out of the JSON) for indicators that were not
/// requested or are not yet defined at that index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Date in YYYY-MM-DD format
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_hist: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_middle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoch_k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoch_d: Option<f64>,
}

/// Compute the requested indicators over an already gap-filled series and
/// return the augmented bars.
pub fn compute_chart(series: &PriceSeries, set: &IndicatorSet) -> Vec<ChartPoint> {
    let bars = series.bars();
    let closes = series.closes();

    let mut points: Vec<ChartPoint> = bars
        .iter()
        .map(|bar| ChartPoint {
            time: bar.date.format("%Y-%m-%d").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            sma10: None,
            sma20: None,
            rsi14: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            bb_middle: None,
            bb_upper: None,
            bb_lower: None,
            stoch_k: None,
            stoch_d: None,
        })
        .collect();

    if set.sma {
        let fast = sma(&closes, SMA_FAST_WINDOW);
        let slow = sma(&closes, SMA_SLOW_WINDOW);
        for (i, point) in points.iter_mut().enumerate() {
            point.sma10 = fast[i];
            point.sma20 = slow[i];
        }
    }

    if set.rsi {
        let values = rsi(&closes, RSI_WINDOW);
        for (i, point) in points.iter_mut().enumerate() {
            point.rsi14 = values[i];
        }
    }

    if set.macd {
        let result = macd(&closes, MACD_FAST_SPAN, MACD_SLOW_SPAN, MACD_SIGNAL_SPAN);
        for (i, point) in points.iter_mut().enumerate() {
            point.macd = Some(result.macd[i]);
            point.macd_signal = Some(result.signal[i]);
            point.macd_hist = Some(result.histogram[i]);
        }
    }

    if set.bollinger {
        let bands = bollinger(&closes, BOLLINGER_WINDOW, BOLLINGER_K);
        for (i, point) in points.iter_mut().enumerate() {
            point.bb_middle = bands.middle[i];
            point.bb_upper = bands.upper[i];
            point.bb_lower = bands.lower[i];
        }
    }

    if set.stochastic {
        let stoch = stochastic(
            &series.highs(),
            &series.lows(),
            &closes,
            STOCH_WINDOW,
            STOCH_SMOOTH_WINDOW,
        );
        for (i, point) in points.iter_mut().enumerate() {
            point.stoch_k = stoch.percent_k[i];
            point.stoch_d = stoch.percent_d[i];
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::NaiveDate;

    fn bar(date: &str, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_sma_literal_series() {
        let closes = [10.0, 12.0, 14.0, 16.0, 18.0];
        let ma3 = sma(&closes, 3);

        assert_eq!(ma3[0], None);
        assert_eq!(ma3[1], None);
        assert_close(ma3[2].unwrap(), 12.0);
        assert_close(ma3[3].unwrap(), 14.0);
        // (14 + 16 + 18) / 3
        assert_close(ma3[4].unwrap(), 16.0);
    }

    #[test]
    fn test_sma_insufficient_history() {
        let ma = sma(&[10.0, 11.0], 5);
        assert!(ma.iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_seeded_by_first_value() {
        let values = [10.0, 13.0];
        let e = ema(&values, 2);
        // alpha = 2/3; 10 then 2/3 * 13 + 1/3 * 10
        assert_close(e[0], 10.0);
        assert_close(e[1], 12.0);
    }

    #[test]
    fn test_rsi_saturates_at_100_on_monotonic_rise() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let values = rsi(&closes, 14);

        assert_eq!(values[13], None);
        for value in values.iter().skip(14) {
            assert_close(value.unwrap(), 100.0);
        }
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // Alternate +1/-1: avg gain equals avg loss, rs = 1, rsi = 50
        let mut closes = vec![100.0];
        for i in 0..20 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let values = rsi(&closes, 14);
        assert_close(values.last().unwrap().unwrap(), 50.0);
    }

    #[test]
    fn test_macd_histogram_identity() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let result = macd(&closes, 12, 26, 9);

        for i in 0..closes.len() {
            assert_close(result.histogram[i], result.macd[i] - result.signal[i]);
        }
    }

    #[test]
    fn test_bollinger_band_width() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i % 5) as f64).collect();
        let bands = bollinger(&closes, 20, 2.0);

        for i in 0..19 {
            assert_eq!(bands.upper[i], None);
        }
        // upper - lower = 2 * k * stddev, and both straddle the middle
        for i in 19..closes.len() {
            let middle = bands.middle[i].unwrap();
            let upper = bands.upper[i].unwrap();
            let lower = bands.lower[i].unwrap();
            assert_close(upper + lower, 2.0 * middle);
            assert!(upper >= middle && lower <= middle);
        }
    }

    #[test]
    fn test_bollinger_sample_stddev() {
        // Window [2, 4]: mean 3, sample variance (1+1)/(2-1) = 2
        let closes = [2.0, 4.0];
        let bands = bollinger(&closes, 2, 2.0);
        let expected_std = 2.0_f64.sqrt();
        assert_close(bands.upper[1].unwrap(), 3.0 + 2.0 * expected_std);
        assert_close(bands.lower[1].unwrap(), 3.0 - 2.0 * expected_std);
    }

    #[test]
    fn test_stochastic_extremes() {
        // Close at the window high yields 100, at the window low yields 0
        let highs: Vec<f64> = (1..=14).map(|i| 10.0 + i as f64).collect();
        let lows = vec![10.0; 14];
        let mut closes = highs.clone();

        let stoch = stochastic(&highs, &lows, &closes, 14, 3);
        assert_close(stoch.percent_k[13].unwrap(), 100.0);

        closes[13] = 10.0; // drop the final close to the window low
        let stoch = stochastic(&highs, &lows, &closes, 14, 3);
        assert_close(stoch.percent_k[13].unwrap(), 0.0);
    }

    #[test]
    fn test_stochastic_flat_window_undefined() {
        let flat = vec![10.0; 15];
        let stoch = stochastic(&flat, &flat, &flat, 14, 3);
        assert!(stoch.percent_k.iter().all(Option::is_none));
        assert!(stoch.percent_d.iter().all(Option::is_none));
    }

    #[test]
    fn test_stochastic_d_is_sma_of_k() {
        let closes: Vec<f64> = (1..=20).map(|i| 10.0 + ((i * 7) % 5) as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 2.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 2.0).collect();
        let stoch = stochastic(&highs, &lows, &closes, 14, 3);

        let expected = (stoch.percent_k[17].unwrap()
            + stoch.percent_k[18].unwrap()
            + stoch.percent_k[19].unwrap())
            / 3.0;
        assert_close(stoch.percent_d[19].unwrap(), expected);
    }

    #[test]
    fn test_indicator_set_parse() {
        let set = IndicatorSet::parse("sma, rsi,BB").unwrap();
        assert!(set.sma && set.rsi && set.bollinger);
        assert!(!set.macd && !set.stochastic);

        assert!(IndicatorSet::parse("sma,bogus").is_err());
        assert!(IndicatorSet::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_compute_chart_gap_fill_end_to_end() {
        // Two-day calendar gap: the prior close must be carried into both
        // missing days before windows are applied, so SMA(2) right after
        // the gap averages the carried value with itself.
        let series = PriceSeries::from_bars(vec![
            bar("2024-01-01", 10.0, 11.0, 9.0, 10.0),
            bar("2024-01-04", 16.0, 17.0, 15.0, 16.0),
        ]);
        let filled = series.fill_daily_gaps();
        assert_eq!(filled.len(), 4);

        let ma2 = sma(&filled.closes(), 2);
        // Jan 2 and Jan 3 both carry 10.0, so SMA(2) on Jan 3 is 10.0
        assert_close(ma2[2].unwrap(), 10.0);
        assert_close(ma2[3].unwrap(), 13.0);

        let points = compute_chart(&filled, &IndicatorSet::all());
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].time, "2024-01-02");
        assert_eq!(points[1].close, 10.0);
        assert_eq!(points[1].volume, 0);
    }

    #[test]
    fn test_compute_chart_skips_unrequested() {
        let series = PriceSeries::from_bars(
            (1..=25)
                .map(|i| bar(&format!("2024-01-{:02}", i), 10.0, 12.0, 9.0, 10.5 + i as f64))
                .collect(),
        );
        let set = IndicatorSet::parse("sma").unwrap();
        let points = compute_chart(&series.fill_daily_gaps(), &set);

        let last = points.last().unwrap();
        assert!(last.sma10.is_some());
        assert!(last.sma20.is_some());
        assert!(last.rsi14.is_none());
        assert!(last.macd.is_none());
        assert!(last.bb_upper.is_none());
        assert!(last.stoch_k.is_none());
    }
}
