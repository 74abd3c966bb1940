use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;

use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1};
use tracing::warn;

use crate::analysis::AnalysisError;
use crate::data::HistoricalData;
use crate::utils::parse_date;

/// Historical adjusted closes: an ascending, unique date index with one
/// column of positive prices per ticker. All columns share the index, so
/// every invariant is checked once here and the statistics functions can
/// assume a dense, NaN-free matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    // rows = dates, cols = tickers
    values: Array2<f64>,
}

impl PriceTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, AnalysisError> {
        if tickers.is_empty() {
            return Err(AnalysisError::InvalidTable(
                "price table needs at least one ticker".into(),
            ));
        }
        let unique: BTreeSet<&String> = tickers.iter().collect();
        if unique.len() != tickers.len() {
            return Err(AnalysisError::InvalidTable(
                "duplicate ticker column".into(),
            ));
        }
        if dates.is_empty() {
            return Err(AnalysisError::InsufficientData {
                needed: 1,
                got: 0,
            });
        }
        if values.dim() != (dates.len(), tickers.len()) {
            return Err(AnalysisError::InvalidTable(format!(
                "value matrix is {:?}, expected ({}, {})",
                values.dim(),
                dates.len(),
                tickers.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::InvalidTable(
                "date index must be strictly ascending".into(),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(AnalysisError::InvalidTable(format!(
                "prices must be positive finite numbers, found {}",
                bad
            )));
        }
        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    /// Assemble a table from broker/CSV records. Missing cells are
    /// forward-filled from the previous session; rows where some column has
    /// no prior observation yet (leading gaps) are dropped.
    pub fn from_records(data: &HistoricalData) -> Result<Self, Box<dyn Error>> {
        let mut columns: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for record in data {
            let date = parse_date(&record.date)?;
            columns
                .entry(record.asset.clone())
                .or_default()
                .insert(date, record.price);
        }

        let tickers: Vec<String> = columns.keys().cloned().collect();
        let all_dates: BTreeSet<NaiveDate> = columns
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();

        let mut last_seen: Vec<Option<f64>> = vec![None; tickers.len()];
        let mut dates = Vec::new();
        let mut rows: Vec<f64> = Vec::new();
        let mut filled = 0usize;
        let mut dropped = 0usize;

        for date in all_dates {
            for (i, ticker) in tickers.iter().enumerate() {
                if let Some(price) = columns[ticker].get(&date) {
                    last_seen[i] = Some(*price);
                } else if last_seen[i].is_some() {
                    filled += 1;
                }
            }
            if last_seen.iter().all(|p| p.is_some()) {
                dates.push(date);
                rows.extend(last_seen.iter().copied().map(|p| p.unwrap_or_default()));
            } else {
                dropped += 1;
            }
        }

        if filled > 0 || dropped > 0 {
            warn!(
                "Repaired price data: {} cells forward-filled, {} leading rows dropped",
                filled, dropped
            );
        }

        let n_rows = dates.len();
        let values = Array2::from_shape_vec((n_rows, tickers.len()), rows)
            .map_err(|e| format!("Could not shape price matrix: {}", e))?;
        Ok(Self::new(dates, tickers, values)?)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(idx)
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }
}

/// Daily fractional price changes, one row fewer than the price table it was
/// derived from. Also reused for cumulative-return series, which share the
/// same shape. Only constructed by the engine, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: Array2<f64>,
}

impl ReturnsTable {
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        Self {
            dates,
            tickers,
            values,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(idx)
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }
}
