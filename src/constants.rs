//! Screening and indicator defaults.
//!
//! The prediction CSV carries CANSLIM model outputs. Column names below
//! must match the CSV header exactly, including the parenthesised
//! buy/sell hints.

/// Column holding the ticker symbol (string key, unique per dataset).
pub const SYMBOL_COLUMN: &str = "Symbol";

/// Numeric rank column used for the default descending sort.
pub const RATE_COLUMN: &str = "Rate";

/// Default display projection for screening results, in display order.
/// Columns absent from a loaded table are silently dropped.
pub const DEFAULT_DISPLAY_COLUMNS: &[&str] = &[
    "Symbol",
    "Rate",
    "Pivot Price (Buy)",
    "Target Price (Sell)",
    "Stop Loss Price",
    "Predict",
];

// Indicator lookback defaults. Windows count calendar days because the
// series is gap-filled to a continuous daily calendar before computation.
pub const SMA_FAST_WINDOW: usize = 10;
pub const SMA_SLOW_WINDOW: usize = 20;
pub const RSI_WINDOW: usize = 14;
pub const MACD_FAST_SPAN: usize = 12;
pub const MACD_SLOW_SPAN: usize = 26;
pub const MACD_SIGNAL_SPAN: usize = 9;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;
pub const STOCH_WINDOW: usize = 14;
pub const STOCH_SMOOTH_WINDOW: usize = 3;
