use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;
use tracing::info;

use crate::table::{PriceTable, ReturnsTable};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// Below this daily standard deviation a return series is treated as flat,
// which makes ratios that divide by it undefined.
const VARIANCE_FLOOR: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("not enough observations: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("invalid portfolio weights: {0}")]
    WeightMismatch(String),
    #[error("returns for {ticker} have zero variance, correlation is undefined")]
    ZeroVariance { ticker: String },
    #[error("invalid table: {0}")]
    InvalidTable(String),
}

/// Per-asset descriptive statistics over daily returns. `sharpe` is `None`
/// when the annualized volatility is zero, since the ratio is undefined
/// rather than infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetStats {
    pub mean_return: f64,
    pub volatility: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: Option<f64>,
}

/// Aggregate statistics for a weighted portfolio. Volatility comes from the
/// full covariance matrix (w'Σw), not the weighted sum of per-asset
/// volatilities, so cross-correlation is priced in.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStats {
    pub mean_return: f64,
    pub volatility: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

/// Pearson correlation of daily returns, symmetric with a unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    tickers: Vec<String>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn new(tickers: Vec<String>, values: Array2<f64>) -> Result<Self, AnalysisError> {
        let n = tickers.len();
        if values.dim() != (n, n) {
            return Err(AnalysisError::InvalidTable(format!(
                "correlation matrix is {:?}, expected ({}, {})",
                values.dim(),
                n,
                n
            )));
        }
        for i in 0..n {
            if values[[i, i]] != 1.0 {
                return Err(AnalysisError::InvalidTable(format!(
                    "correlation diagonal must be exactly 1.0, found {} for {}",
                    values[[i, i]],
                    tickers[i]
                )));
            }
            for j in (i + 1)..n {
                if (values[[i, j]] - values[[j, i]]).abs() > 1e-12 {
                    return Err(AnalysisError::InvalidTable(format!(
                        "correlation matrix is not symmetric at ({}, {})",
                        tickers[i], tickers[j]
                    )));
                }
            }
        }
        Ok(Self { tickers, values })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }
}

/// Daily percentage change per column.
pub fn compute_returns(prices: &PriceTable) -> Result<ReturnsTable, AnalysisError> {
    let n = prices.n_rows();
    if n < 2 {
        return Err(AnalysisError::InsufficientData { needed: 2, got: n });
    }
    let values = prices.values();
    let mut returns = Array2::<f64>::zeros((n - 1, prices.n_assets()));
    for t in 1..n {
        for i in 0..prices.n_assets() {
            let prev = values[[t - 1, i]];
            returns[[t - 1, i]] = (values[[t, i]] - prev) / prev;
        }
    }
    info!(
        "Computed daily returns: {} rows x {} assets",
        n - 1,
        prices.n_assets()
    );
    Ok(ReturnsTable::from_parts(
        prices.dates()[1..].to_vec(),
        prices.tickers().to_vec(),
        returns,
    ))
}

/// Mean, sample volatility (ddof = 1) and 252-day annualized figures per
/// ticker.
pub fn compute_asset_stats(
    returns: &ReturnsTable,
    risk_free_rate: f64,
) -> Result<BTreeMap<String, AssetStats>, AnalysisError> {
    ensure_observations(returns, 2)?;
    let mut stats = BTreeMap::new();
    for (i, ticker) in returns.tickers().iter().enumerate() {
        let col = returns.column(i);
        let mean_return = column_mean(col);
        let volatility = sample_std(col, mean_return);
        let annualized_return = mean_return * TRADING_DAYS_PER_YEAR;
        let annualized_volatility = volatility * TRADING_DAYS_PER_YEAR.sqrt();
        stats.insert(
            ticker.clone(),
            AssetStats {
                mean_return,
                volatility,
                annualized_return,
                annualized_volatility,
                sharpe: sharpe_ratio(annualized_return, annualized_volatility, risk_free_rate),
            },
        );
    }
    Ok(stats)
}

/// Pairwise Pearson correlation. The diagonal is pinned at 1.0 and the upper
/// triangle is mirrored, so symmetry holds by construction. A flat column
/// fails with `ZeroVariance` instead of letting a NaN through.
pub fn compute_correlation_matrix(
    returns: &ReturnsTable,
) -> Result<CorrelationMatrix, AnalysisError> {
    ensure_observations(returns, 2)?;
    let n_assets = returns.n_assets();
    let n_obs = returns.n_rows() as f64;

    let mut means = Vec::with_capacity(n_assets);
    let mut stds = Vec::with_capacity(n_assets);
    for (i, ticker) in returns.tickers().iter().enumerate() {
        let mean = column_mean(returns.column(i));
        let std = sample_std(returns.column(i), mean);
        if std < VARIANCE_FLOOR {
            return Err(AnalysisError::ZeroVariance {
                ticker: ticker.clone(),
            });
        }
        means.push(mean);
        stds.push(std);
    }

    let mut values = Array2::<f64>::zeros((n_assets, n_assets));
    for i in 0..n_assets {
        values[[i, i]] = 1.0;
        for j in (i + 1)..n_assets {
            let cov: f64 = returns
                .column(i)
                .iter()
                .zip(returns.column(j).iter())
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum::<f64>()
                / (n_obs - 1.0);
            let rho = cov / (stds[i] * stds[j]);
            values[[i, j]] = rho;
            values[[j, i]] = rho;
        }
    }
    Ok(CorrelationMatrix {
        tickers: returns.tickers().to_vec(),
        values,
    })
}

/// Sample covariance of daily returns, Cov = C'C / (n - 1) over the centered
/// return matrix. This is the Σ behind portfolio variance.
pub fn compute_covariance_matrix(returns: &ReturnsTable) -> Result<Array2<f64>, AnalysisError> {
    ensure_observations(returns, 2)?;
    let n_obs = returns.n_rows();
    let mut centered = returns.values().clone();
    for i in 0..returns.n_assets() {
        let mean = column_mean(returns.column(i));
        centered.column_mut(i).mapv_inplace(|v| v - mean);
    }
    let factor = 1.0 / (n_obs as f64 - 1.0);
    Ok(centered.t().dot(&centered) * factor)
}

/// Aggregate statistics for a weight vector over the return columns. The
/// weights must cover exactly the table's ticker set and sum to 1 within
/// `WEIGHT_SUM_TOLERANCE`; renormalizing sloppy input is the caller's job.
pub fn compute_portfolio_stats(
    returns: &ReturnsTable,
    weights: &BTreeMap<String, f64>,
    risk_free_rate: f64,
) -> Result<PortfolioStats, AnalysisError> {
    let w = align_weights(returns, weights)?;
    ensure_observations(returns, 2)?;

    let means: Array1<f64> = (0..returns.n_assets())
        .map(|i| column_mean(returns.column(i)))
        .collect();
    let mean_return = means.dot(&w);

    let covariance = compute_covariance_matrix(returns)?;
    let variance = w.dot(&covariance.dot(&w));
    let volatility = variance.max(0.0).sqrt();

    let annualized_return = mean_return * TRADING_DAYS_PER_YEAR;
    let annualized_volatility = volatility * TRADING_DAYS_PER_YEAR.sqrt();
    Ok(PortfolioStats {
        mean_return,
        volatility,
        annualized_return,
        annualized_volatility,
        sharpe: sharpe_ratio(annualized_return, annualized_volatility, risk_free_rate),
    })
}

/// Realized daily portfolio returns, the weighted sum across columns. Its
/// mean and sample variance agree with `compute_portfolio_stats` up to
/// floating-point noise.
pub fn portfolio_return_series(
    returns: &ReturnsTable,
    weights: &BTreeMap<String, f64>,
) -> Result<Vec<f64>, AnalysisError> {
    let w = align_weights(returns, weights)?;
    Ok(returns
        .values()
        .rows()
        .into_iter()
        .map(|row| row.dot(&w))
        .collect())
}

/// Off-diagonal pairs with |rho| >= threshold, each reported once with the
/// tickers in lexical order, sorted by descending |rho| (ties by pair order).
pub fn find_high_correlation_pairs(
    matrix: &CorrelationMatrix,
    threshold: f64,
) -> Vec<(String, String, f64)> {
    let tickers = matrix.tickers();
    let mut pairs = Vec::new();
    for i in 0..tickers.len() {
        for j in (i + 1)..tickers.len() {
            let rho = matrix.values()[[i, j]];
            if rho.abs() >= threshold {
                let (a, b) = if tickers[i] <= tickers[j] {
                    (i, j)
                } else {
                    (j, i)
                };
                pairs.push((tickers[a].clone(), tickers[b].clone(), rho));
            }
        }
    }
    pairs.sort_by(|x, y| {
        y.2.abs()
            .partial_cmp(&x.2.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (x.0.as_str(), x.1.as_str()).cmp(&(y.0.as_str(), y.1.as_str())))
    });
    pairs
}

/// Compounded growth per column: prod(1 + r) - 1, same shape as the input.
pub fn compute_cumulative_returns(returns: &ReturnsTable) -> ReturnsTable {
    let mut cumulative = returns.values().clone();
    for i in 0..returns.n_assets() {
        let mut growth = 1.0;
        for t in 0..returns.n_rows() {
            growth *= 1.0 + cumulative[[t, i]];
            cumulative[[t, i]] = growth - 1.0;
        }
    }
    ReturnsTable::from_parts(
        returns.dates().to_vec(),
        returns.tickers().to_vec(),
        cumulative,
    )
}

/// Min/max/mean/std of the raw prices per ticker.
pub fn price_summary(
    prices: &PriceTable,
) -> Result<BTreeMap<String, PriceSummary>, AnalysisError> {
    if prices.n_rows() < 2 {
        return Err(AnalysisError::InsufficientData {
            needed: 2,
            got: prices.n_rows(),
        });
    }
    let mut summary = BTreeMap::new();
    for (i, ticker) in prices.tickers().iter().enumerate() {
        let col = prices.column(i);
        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = column_mean(col);
        let std = sample_std(col, mean);
        summary.insert(ticker.clone(), PriceSummary { min, max, mean, std });
    }
    Ok(summary)
}

fn ensure_observations(returns: &ReturnsTable, needed: usize) -> Result<(), AnalysisError> {
    if returns.n_rows() < needed {
        return Err(AnalysisError::InsufficientData {
            needed,
            got: returns.n_rows(),
        });
    }
    Ok(())
}

fn column_mean(col: ArrayView1<f64>) -> f64 {
    col.sum() / col.len() as f64
}

// Sample standard deviation, delta degrees of freedom = 1.
fn sample_std(col: ArrayView1<f64>, mean: f64) -> f64 {
    let sum_sq: f64 = col.iter().map(|r| (r - mean).powi(2)).sum();
    (sum_sq / (col.len() as f64 - 1.0)).sqrt()
}

fn sharpe_ratio(
    annualized_return: f64,
    annualized_volatility: f64,
    risk_free_rate: f64,
) -> Option<f64> {
    if annualized_volatility < VARIANCE_FLOOR {
        None
    } else {
        Some((annualized_return - risk_free_rate) / annualized_volatility)
    }
}

/// Check the weight vector against the table's ticker set and align it with
/// the column order.
fn align_weights(
    returns: &ReturnsTable,
    weights: &BTreeMap<String, f64>,
) -> Result<Array1<f64>, AnalysisError> {
    for ticker in weights.keys() {
        if !returns.tickers().contains(ticker) {
            return Err(AnalysisError::WeightMismatch(format!(
                "weight given for unknown ticker {}",
                ticker
            )));
        }
    }
    let mut aligned = Vec::with_capacity(returns.n_assets());
    for ticker in returns.tickers() {
        let w = weights.get(ticker).ok_or_else(|| {
            AnalysisError::WeightMismatch(format!("missing weight for {}", ticker))
        })?;
        if *w < 0.0 {
            return Err(AnalysisError::WeightMismatch(format!(
                "negative weight {} for {}",
                w, ticker
            )));
        }
        aligned.push(*w);
    }
    let total: f64 = aligned.iter().sum();
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(AnalysisError::WeightMismatch(format!(
            "weights sum to {}, expected 1.0 within {:e}",
            total, WEIGHT_SUM_TOLERANCE
        )));
    }
    Ok(Array1::from(aligned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn price_table(tickers: &[&str], values: Array2<f64>) -> PriceTable {
        let n = values.nrows();
        PriceTable::new(
            dates(n),
            tickers.iter().map(|t| t.to_string()).collect(),
            values,
        )
        .unwrap()
    }

    fn returns_table(tickers: &[&str], values: Array2<f64>) -> ReturnsTable {
        let n = values.nrows();
        ReturnsTable::from_parts(
            dates(n),
            tickers.iter().map(|t| t.to_string()).collect(),
            values,
        )
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn returns_have_one_fewer_row_and_same_columns() {
        let prices = price_table(&["AAPL", "MSFT"], array![[100.0, 50.0], [110.0, 55.0], [99.0, 66.0]]);
        let returns = compute_returns(&prices).unwrap();
        assert_eq!(returns.n_rows(), prices.n_rows() - 1);
        assert_eq!(returns.tickers(), prices.tickers());
        assert_eq!(returns.dates(), &prices.dates()[1..]);
        assert_abs_diff_eq!(returns.values()[[0, 0]], 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.values()[[1, 0]], -0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.values()[[1, 1]], 0.20, epsilon = 1e-12);
    }

    #[test]
    fn single_row_table_cannot_produce_returns() {
        let prices = price_table(&["AAPL"], array![[100.0]]);
        let err = compute_returns(&prices).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { needed: 2, got: 1 }
        ));
    }

    #[test]
    fn asset_stats_on_known_series() {
        // mean 0.02, sample std exactly 0.01
        let returns = returns_table(&["AAPL"], array![[0.01], [0.03], [0.02]]);
        let stats = compute_asset_stats(&returns, 0.02).unwrap();
        let aapl = &stats["AAPL"];
        assert_abs_diff_eq!(aapl.mean_return, 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(aapl.volatility, 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(aapl.annualized_return, 0.02 * 252.0, epsilon = 1e-12);
        // 0.01 * sqrt(252) ~ 0.1587
        assert_abs_diff_eq!(aapl.annualized_volatility, 0.1587, epsilon = 1e-4);
        let expected_sharpe =
            (aapl.annualized_return - 0.02) / aapl.annualized_volatility;
        assert_abs_diff_eq!(aapl.sharpe.unwrap(), expected_sharpe, epsilon = 1e-12);
    }

    #[test]
    fn flat_series_has_undefined_sharpe() {
        let returns = returns_table(&["BOND"], array![[0.0], [0.0], [0.0]]);
        let stats = compute_asset_stats(&returns, 0.02).unwrap();
        assert_eq!(stats["BOND"].volatility, 0.0);
        assert_eq!(stats["BOND"].sharpe, None);
    }

    #[test]
    fn too_few_observations_for_stats() {
        let returns = returns_table(&["AAPL"], array![[0.01]]);
        let err = compute_asset_stats(&returns, 0.02).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { needed: 2, got: 1 }
        ));
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let returns = returns_table(
            &["A", "B", "C"],
            array![
                [0.010, 0.020, -0.004],
                [-0.020, 0.010, 0.012],
                [0.015, -0.010, 0.003],
                [0.030, 0.005, -0.010],
                [-0.005, 0.000, 0.007]
            ],
        );
        let matrix = compute_correlation_matrix(&returns).unwrap();
        for i in 0..3 {
            assert_eq!(matrix.values()[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(matrix.values()[[i, j]], matrix.values()[[j, i]]);
                assert!(matrix.values()[[i, j]].abs() <= 1.0 + 1e-12);
            }
        }
    }

    #[test]
    fn linearly_dependent_series_correlate_at_unity() {
        let x = [0.01, -0.02, 0.015, 0.03, -0.005];
        let double: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let negated: Vec<f64> = x.iter().map(|v| -v).collect();
        let mut values = Array2::<f64>::zeros((5, 3));
        for t in 0..5 {
            values[[t, 0]] = x[t];
            values[[t, 1]] = double[t];
            values[[t, 2]] = negated[t];
        }
        let returns = returns_table(&["X", "Y", "Z"], values);
        let matrix = compute_correlation_matrix(&returns).unwrap();
        assert_abs_diff_eq!(matrix.values()[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(matrix.values()[[0, 2]], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_variance_column_is_rejected() {
        let returns = returns_table(&["A", "FLAT"], array![[0.01, 0.0], [0.02, 0.0], [-0.01, 0.0]]);
        let err = compute_correlation_matrix(&returns).unwrap_err();
        match err {
            AnalysisError::ZeroVariance { ticker } => assert_eq!(ticker, "FLAT"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn portfolio_mean_matches_realized_series() {
        let returns = returns_table(
            &["A", "B"],
            array![
                [0.010, 0.020],
                [-0.020, 0.010],
                [0.015, -0.010],
                [0.030, 0.005],
                [-0.005, 0.000]
            ],
        );
        let w = weights(&[("A", 0.3), ("B", 0.7)]);
        let stats = compute_portfolio_stats(&returns, &w, 0.02).unwrap();
        let series = portfolio_return_series(&returns, &w).unwrap();
        let realized_mean: f64 = series.iter().sum::<f64>() / series.len() as f64;
        assert_abs_diff_eq!(stats.mean_return, realized_mean, epsilon = 1e-9);
    }

    #[test]
    fn portfolio_variance_matches_realized_series() {
        let returns = returns_table(
            &["A", "B"],
            array![
                [0.010, 0.020],
                [-0.020, 0.010],
                [0.015, -0.010],
                [0.030, 0.005],
                [-0.005, 0.000]
            ],
        );
        let w = weights(&[("A", 0.3), ("B", 0.7)]);
        let stats = compute_portfolio_stats(&returns, &w, 0.02).unwrap();
        let series = portfolio_return_series(&returns, &w).unwrap();
        let mean: f64 = series.iter().sum::<f64>() / series.len() as f64;
        let realized_var: f64 = series.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (series.len() as f64 - 1.0);
        assert_abs_diff_eq!(stats.volatility.powi(2), realized_var, epsilon = 1e-9);
    }

    #[test]
    fn weight_sum_outside_tolerance_is_rejected() {
        let returns = returns_table(&["A", "B"], array![[0.01, 0.02], [0.02, 0.01], [-0.01, 0.0]]);
        let err = compute_portfolio_stats(&returns, &weights(&[("A", 0.49), ("B", 0.5)]), 0.02)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::WeightMismatch(_)));

        // 1.0 + 1e-7 is inside the 1e-6 tolerance
        let ok = compute_portfolio_stats(
            &returns,
            &weights(&[("A", 0.5), ("B", 0.5 + 1e-7)]),
            0.02,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn weight_ticker_set_must_match_exactly() {
        let returns = returns_table(&["A", "B"], array![[0.01, 0.02], [0.02, 0.01], [-0.01, 0.0]]);

        let missing = compute_portfolio_stats(&returns, &weights(&[("A", 1.0)]), 0.02);
        assert!(matches!(
            missing.unwrap_err(),
            AnalysisError::WeightMismatch(_)
        ));

        let extra = compute_portfolio_stats(
            &returns,
            &weights(&[("A", 0.5), ("B", 0.25), ("C", 0.25)]),
            0.02,
        );
        assert!(matches!(
            extra.unwrap_err(),
            AnalysisError::WeightMismatch(_)
        ));

        let negative = compute_portfolio_stats(
            &returns,
            &weights(&[("A", 1.5), ("B", -0.5)]),
            0.02,
        );
        assert!(matches!(
            negative.unwrap_err(),
            AnalysisError::WeightMismatch(_)
        ));
    }

    #[test]
    fn single_asset_portfolio_equals_asset_stats() {
        let returns = returns_table(
            &["A", "B"],
            array![
                [0.010, 0.020],
                [-0.020, 0.010],
                [0.015, -0.010],
                [0.030, 0.005]
            ],
        );
        let asset = &compute_asset_stats(&returns, 0.02).unwrap()["A"];
        let portfolio =
            compute_portfolio_stats(&returns, &weights(&[("A", 1.0), ("B", 0.0)]), 0.02).unwrap();
        assert_relative_eq!(portfolio.mean_return, asset.mean_return, epsilon = 1e-12);
        assert_relative_eq!(portfolio.volatility, asset.volatility, epsilon = 1e-12);
        assert_relative_eq!(
            portfolio.annualized_return,
            asset.annualized_return,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            portfolio.annualized_volatility,
            asset.annualized_volatility,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            portfolio.sharpe.unwrap(),
            asset.sharpe.unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn high_correlation_pairs_on_reference_matrix() {
        let tickers = vec![
            "JPM".to_string(),
            "AAPL".to_string(),
            "MSFT".to_string(),
            "SPY".to_string(),
        ];
        let values = array![
            [1.0, 0.45, 0.42, 0.68],
            [0.45, 1.0, 0.78, 0.62],
            [0.42, 0.78, 1.0, 0.71],
            [0.68, 0.62, 0.71, 1.0]
        ];
        let matrix = CorrelationMatrix::new(tickers, values).unwrap();
        let pairs = find_high_correlation_pairs(&matrix, 0.7);
        assert_eq!(
            pairs,
            vec![
                ("AAPL".to_string(), "MSFT".to_string(), 0.78),
                ("MSFT".to_string(), "SPY".to_string(), 0.71),
            ]
        );
    }

    #[test]
    fn pair_threshold_is_inclusive_and_uses_absolute_value() {
        let tickers = vec![
            "A".to_string(),
            "B".to_string(),
            "C".to_string(),
            "D".to_string(),
        ];
        let values = array![
            [1.0, 0.7, 0.0, 0.0],
            [0.7, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, -0.9],
            [0.0, 0.0, -0.9, 1.0]
        ];
        let matrix = CorrelationMatrix::new(tickers, values).unwrap();
        let pairs = find_high_correlation_pairs(&matrix, 0.7);
        assert_eq!(
            pairs,
            vec![
                ("C".to_string(), "D".to_string(), -0.9),
                ("A".to_string(), "B".to_string(), 0.7),
            ]
        );
    }

    #[test]
    fn tied_pairs_fall_back_to_lexical_order() {
        let tickers = vec![
            "D".to_string(),
            "C".to_string(),
            "B".to_string(),
            "A".to_string(),
        ];
        let values = array![
            [1.0, 0.9, 0.0, 0.0],
            [0.9, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, -0.9],
            [0.0, 0.0, -0.9, 1.0]
        ];
        let matrix = CorrelationMatrix::new(tickers, values).unwrap();
        let pairs = find_high_correlation_pairs(&matrix, 0.8);
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "B".to_string(), -0.9),
                ("C".to_string(), "D".to_string(), 0.9),
            ]
        );
    }

    #[test]
    fn engine_is_idempotent() {
        let returns = returns_table(
            &["A", "B"],
            array![[0.01, 0.02], [0.02, 0.01], [-0.01, 0.005]],
        );
        let w = weights(&[("A", 0.4), ("B", 0.6)]);
        assert_eq!(
            compute_asset_stats(&returns, 0.02).unwrap(),
            compute_asset_stats(&returns, 0.02).unwrap()
        );
        assert_eq!(
            compute_correlation_matrix(&returns).unwrap(),
            compute_correlation_matrix(&returns).unwrap()
        );
        assert_eq!(
            compute_portfolio_stats(&returns, &w, 0.02).unwrap(),
            compute_portfolio_stats(&returns, &w, 0.02).unwrap()
        );
    }

    #[test]
    fn cumulative_returns_compound() {
        let returns = returns_table(&["A"], array![[0.01], [0.01], [0.01]]);
        let cumulative = compute_cumulative_returns(&returns);
        assert_abs_diff_eq!(cumulative.values()[[0, 0]], 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(cumulative.values()[[1, 0]], 0.0201, epsilon = 1e-12);
        assert_abs_diff_eq!(cumulative.values()[[2, 0]], 0.030301, epsilon = 1e-12);
    }

    #[test]
    fn price_summary_describes_columns() {
        let prices = price_table(&["AAPL"], array![[100.0], [101.0], [99.0]]);
        let summary = price_summary(&prices).unwrap();
        let aapl = &summary["AAPL"];
        assert_eq!(aapl.min, 99.0);
        assert_eq!(aapl.max, 101.0);
        assert_abs_diff_eq!(aapl.mean, 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(aapl.std, 1.0, epsilon = 1e-12);
    }
}
