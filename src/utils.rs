use std::path::Path;

use chrono::{Duration, Local, NaiveDate, ParseError};
use csv::WriterBuilder;

use crate::analysis::AssetStats;
use crate::table::PriceTable;
use std::collections::BTreeMap;

/// Writes a PriceTable to CSV, one row per date with a column per ticker.
pub fn write_prices_csv(prices: &PriceTable, output_path: &str) -> Result<(), csv::Error> {
    if let Some(parent) = Path::new(output_path).parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directories for CSV output");
    }
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(output_path)?;

    let mut header = vec!["date".to_string()];
    header.extend(prices.tickers().iter().cloned());
    wtr.write_record(&header)?;

    for (i, date) in prices.dates().iter().enumerate() {
        let mut row = vec![date.format("%Y-%m-%d").to_string()];
        row.extend(prices.values().row(i).iter().map(|p| p.to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the per-ticker metrics table to CSV, one row per ticker.
pub fn write_metrics_csv(
    stats: &BTreeMap<String, AssetStats>,
    output_path: &str,
) -> Result<(), csv::Error> {
    if let Some(parent) = Path::new(output_path).parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directories for CSV output");
    }
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(output_path)?;

    wtr.write_record([
        "ticker",
        "mean_daily_return",
        "daily_volatility",
        "annualized_return",
        "annualized_volatility",
        "sharpe_ratio",
    ])?;
    for (ticker, s) in stats {
        wtr.write_record([
            ticker.clone(),
            s.mean_return.to_string(),
            s.volatility.to_string(),
            s.annualized_return.to_string(),
            s.annualized_volatility.to_string(),
            s.sharpe.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn parse_date(date_str: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Trailing window of `years` ending today, as config-style date strings.
pub fn default_date_range(years: i64) -> (String, String) {
    let end = Local::now().date_naive();
    let start = end - Duration::days(365 * years);
    (
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}

/// Quick sanity check on the configured ticker list.
pub fn validate_tickers(tickers: &[String]) -> bool {
    if tickers.is_empty() {
        return false;
    }
    tickers
        .iter()
        .all(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'))
}
