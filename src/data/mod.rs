pub mod data_brokers;

use crate::config::Settings;
use crate::utils::{default_date_range, parse_date};
use chrono::NaiveDate;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
pub struct Record {
    pub date: String,
    pub asset: String,
    pub price: f64,
}

pub type HistoricalData = Vec<Record>;

/// Reads CSV into HistoricalData
fn read_csv(path: &str) -> Result<HistoricalData, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let mut data = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let date = record.get(0).ok_or("Missing date column in CSV")?.to_string();
        for (i, asset_name) in headers.iter().enumerate().skip(1) {
            if let Some(price_str) = record.get(i) {
                if let Ok(price) = price_str.parse::<f64>() {
                    data.push(Record {
                        date: date.clone(),
                        asset: asset_name.to_string(),
                        price,
                    });
                }
            }
        }
    }
    Ok(data)
}

/// Resolve the analysis window from config, falling back to the
/// trailing year when no explicit dates are set.
pub(crate) fn resolve_date_range(
    settings: &Settings,
) -> Result<(NaiveDate, NaiveDate), Box<dyn Error>> {
    let (default_start, default_end) = default_date_range(1);
    let start_str = settings
        .data_api
        .start_date
        .clone()
        .unwrap_or(default_start);
    let end_str = settings.data_api.end_date.clone().unwrap_or(default_end);

    let start = parse_date(&start_str)?;
    let end = parse_date(&end_str)?;
    if start >= end {
        return Err(format!("Invalid date range: {} >= {}", start, end).into());
    }
    Ok((start, end))
}

pub async fn fetch_data(settings: &Settings) -> Result<HistoricalData, Box<dyn Error>> {
    match settings.general.data_source.as_str() {
        "csv" => read_csv(&settings.general.data_file),
        "api" => data_brokers::fetch_data(settings).await,
        _ => Err("Unknown data source specified.".into()),
    }
}
