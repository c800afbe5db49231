pub mod filter;
pub mod indicators;

pub use filter::{column_bounds, filter, run_screen, FilterSpec, RangeFilter, ScreenRequest};
pub use indicators::{compute_chart, ChartPoint, IndicatorSet};
