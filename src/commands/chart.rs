use crate::engine::{ChartPoint, IndicatorSet};
use crate::error::Result;
use crate::services::{ChartService, VciClient};
use std::path::PathBuf;

pub async fn run(
    symbol: String,
    start: String,
    end: Option<String>,
    indicators: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut set = match indicators {
        Some(list) => IndicatorSet::parse(&list)?,
        None => IndicatorSet::all(),
    };
    if set.is_empty() {
        set = IndicatorSet::all();
    }

    println!("📈 Fetching history for {} from {}", symbol, start);
    let vci = VciClient::new(true, 30)
        .map_err(|e| crate::error::AppError::Network(e.to_string()))?;
    let mut service = ChartService::new(vci);

    let points = service
        .chart(&symbol, &start, end.as_deref(), &set)
        .await?;
    println!("✅ {} daily bars (gap-filled calendar)", points.len());

    match output {
        Some(path) => {
            write_csv(&points, &path)?;
            println!("💾 Wrote {}", path.display());
        }
        None => print_points(&points),
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn print_points(points: &[ChartPoint]) {
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10} {:>10} {:>8}",
        "date", "open", "high", "low", "close", "volume", "sma10", "sma20", "rsi14"
    );
    for p in points {
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>10} {:>10} {:>8}",
            p.time,
            p.open,
            p.high,
            p.low,
            p.close,
            p.volume,
            fmt_opt(p.sma10),
            fmt_opt(p.sma20),
            fmt_opt(p.rsi14),
        );
    }
}

fn write_csv(points: &[ChartPoint], path: &PathBuf) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "time", "open", "high", "low", "close", "volume", "sma10", "sma20", "rsi14", "macd",
        "macd_signal", "macd_hist", "bb_middle", "bb_upper", "bb_lower", "stoch_k", "stoch_d",
    ])?;

    for p in points {
        writer.write_record([
            p.time.clone(),
            p.open.to_string(),
            p.high.to_string(),
            p.low.to_string(),
            p.close.to_string(),
            p.volume.to_string(),
            fmt_opt(p.sma10),
            fmt_opt(p.sma20),
            fmt_opt(p.rsi14),
            fmt_opt(p.macd),
            fmt_opt(p.macd_signal),
            fmt_opt(p.macd_hist),
            fmt_opt(p.bb_middle),
            fmt_opt(p.bb_upper),
            fmt_opt(p.bb_lower),
            fmt_opt(p.stoch_k),
            fmt_opt(p.stoch_d),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
